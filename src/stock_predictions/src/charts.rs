use chrono::{Datelike, NaiveDate};
use nalgebra::DVector;
use plotters::prelude::*;
use polars::prelude::DataFrame;

use crate::market_data::{timestamp_to_date, TIMESTAMP_COLUMN};
use crate::predictor::analysis::FeatureSettings;
use crate::predictor::api::{Evaluation, PredictionError};

const CHART_SIZE: (u32, u32) = (1000, 600);
const SCATTER_SIZE: (u32, u32) = (1000, 500);

const ORANGE: RGBColor = RGBColor(255, 165, 0);
const DARK_GREEN: RGBColor = RGBColor(0, 128, 0);
const DODGER_BLUE: RGBColor = RGBColor(30, 144, 255);
const GRAY: RGBColor = RGBColor(128, 128, 128);
const VOLATILITY_PALETTE: [RGBColor; 3] = [ORANGE, DARK_GREEN, RED];

struct Line<'a> {
    label: &'a str,
    color: RGBColor,
    dashed: bool,
    points: Vec<(f64, f64)>,
}

struct Axes<'a> {
    title: &'a str,
    x_desc: &'a str,
    y_desc: &'a str,
    dates_on_x: bool,
}

fn render_error<E: std::fmt::Display>(error: E) -> PredictionError {
    PredictionError::ChartError(error.to_string())
}

fn date_to_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn x_to_date_label(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

/// `(min, max)` padded by 5%, or `None` when there are no finite values.
fn padded_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
    Some((min - pad, max + pad))
}

/// Alternating pieces of each segment, so the path reads as dashed.
fn dashed_segments(points: &[(f64, f64)], style: ShapeStyle) -> Vec<PathElement<(f64, f64)>> {
    const PIECES: usize = 4;
    points
        .windows(2)
        .flat_map(|pair| {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            (0..PIECES).step_by(2).map(move |k| {
                let t0 = k as f64 / PIECES as f64;
                let t1 = (k + 1) as f64 / PIECES as f64;
                PathElement::new(
                    vec![
                        (x0 + (x1 - x0) * t0, y0 + (y1 - y0) * t0),
                        (x0 + (x1 - x0) * t1, y0 + (y1 - y0) * t1),
                    ],
                    style,
                )
            })
        })
        .collect()
}

fn line_chart(axes: &Axes, lines: &[Line]) -> Result<String, PredictionError> {
    let x_range = padded_range(lines.iter().flat_map(|l| l.points.iter().map(|p| p.0)));
    let y_range = padded_range(lines.iter().flat_map(|l| l.points.iter().map(|p| p.1)));
    let (Some((x_min, x_max)), Some((y_min, y_max))) = (x_range, y_range) else {
        return Err(PredictionError::ChartError(format!(
            "nothing to plot for '{}'",
            axes.title
        )));
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(axes.title, ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(render_error)?;

        let date_label = |x: &f64| x_to_date_label(*x);
        let mut mesh = chart.configure_mesh();
        mesh.x_desc(axes.x_desc).y_desc(axes.y_desc);
        if axes.dates_on_x {
            mesh.x_label_formatter(&date_label);
        }
        mesh.draw().map_err(render_error)?;

        for line in lines {
            let style = line.color.stroke_width(2);
            let color = line.color;
            let annotation = if line.dashed {
                chart
                    .draw_series(dashed_segments(&line.points, style))
                    .map_err(render_error)?
            } else {
                chart
                    .draw_series(LineSeries::new(line.points.iter().copied(), style))
                    .map_err(render_error)?
            };
            annotation
                .label(line.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(render_error)?;
        root.present().map_err(render_error)?;
    }
    Ok(svg)
}

/// Every rolling volatility column against the trading date.
pub fn volatility_chart(
    engineered: &DataFrame,
    settings: &FeatureSettings,
) -> Result<String, PredictionError> {
    let dates: Vec<Option<f64>> = engineered
        .column(TIMESTAMP_COLUMN)?
        .i64()?
        .into_iter()
        .map(|ts| ts.and_then(timestamp_to_date).map(date_to_x))
        .collect();

    let names = settings.volatility_columns();
    let mut lines = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let values = engineered.column(name)?.f64()?;
        let points = dates
            .iter()
            .zip(values.into_iter())
            .filter_map(|(x, y)| Some(((*x)?, y?)))
            .collect();
        lines.push(Line {
            label: name,
            color: VOLATILITY_PALETTE[i % VOLATILITY_PALETTE.len()],
            dashed: false,
            points,
        });
    }

    line_chart(
        &Axes {
            title: "RV against time",
            x_desc: "Date",
            y_desc: "Volatility",
            dates_on_x: true,
        },
        &lines,
    )
}

/// Held-out targets and predictions against the trading date.
pub fn actual_vs_predicted_chart(evaluation: &Evaluation) -> Result<String, PredictionError> {
    let rows = evaluation.by_date();
    let actual = rows.iter().map(|&(d, a, _)| (date_to_x(d), a)).collect();
    let predicted = rows.iter().map(|&(d, _, p)| (date_to_x(d), p)).collect();
    line_chart(
        &Axes {
            title: "Actual vs Predicted Adjusted Close Price",
            x_desc: "Date",
            y_desc: "Adjusted Close",
            dates_on_x: true,
        },
        &[
            Line {
                label: "Actual Adjusted Close Price",
                color: BLUE,
                dashed: false,
                points: actual,
            },
            Line {
                label: "Predicted Adjusted Close Price",
                color: RED,
                dashed: true,
                points: predicted,
            },
        ],
    )
}

/// Predicted against actual targets with the perfect-prediction diagonal.
pub fn prediction_scatter_chart(
    actual: &DVector<f64>,
    predicted: &DVector<f64>,
) -> Result<String, PredictionError> {
    if actual.len() != predicted.len() {
        return Err(PredictionError::ChartError(format!(
            "{} actual values but {} predictions",
            actual.len(),
            predicted.len()
        )));
    }
    let Some((lo, hi)) = padded_range(actual.iter().chain(predicted.iter()).copied()) else {
        return Err(PredictionError::ChartError("nothing to plot".to_string()));
    };
    let min_val = actual.min().min(predicted.min());
    let max_val = actual.max().max(predicted.max());

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SCATTER_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;
        let mut chart = ChartBuilder::on(&root)
            .caption("Actual vs Predicted Prices (Training Set)", ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(lo..hi, lo..hi)
            .map_err(render_error)?;
        chart
            .configure_mesh()
            .x_desc("Actual Stock Price")
            .y_desc("Predicted Stock Price")
            .draw()
            .map_err(render_error)?;

        chart
            .draw_series(
                actual
                    .iter()
                    .zip(predicted.iter())
                    .map(|(&a, &p)| Circle::new((a, p), 4, DODGER_BLUE.mix(0.6).filled())),
            )
            .map_err(render_error)?
            .label("Model Predictions")
            .legend(|(x, y)| Circle::new((x + 10, y), 4, DODGER_BLUE.filled()));

        let diagonal = [(min_val, min_val), (max_val, max_val)];
        chart
            .draw_series(dashed_segments(&diagonal, GRAY.stroke_width(2)))
            .map_err(render_error)?
            .label("Perfect Prediction")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GRAY.stroke_width(2)));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(render_error)?;
        root.present().map_err(render_error)?;
    }
    Ok(svg)
}
