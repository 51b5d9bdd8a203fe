use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stock_predictions::charts::{actual_vs_predicted_chart, volatility_chart};
use stock_predictions::config::ReportConfig;
use stock_predictions::predictor::analysis::CorrelationReport;
use stock_predictions::predictor::regression::RegressionPredictor;
use stock_predictions::StockPredictor;

fn write_chart(dir: &Path, name: &str, svg: &str) -> Result<()> {
    let path = dir.join(name);
    fs::write(&path, svg).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "wrote chart");
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ReportConfig::parse();
    let settings = config.prediction_settings(Local::now().date_naive());
    info!(ticker = %settings.ticker, start = %settings.start, end = %settings.end, "starting report");

    let source = config.source.open().context("opening price source")?;
    let stock_predictor = StockPredictor::new(RegressionPredictor::new(source, settings));
    let run = stock_predictor
        .update_predictions()
        .with_context(|| format!("running the pipeline for {}", config.source.ticker))?;

    std::env::set_var("POLARS_FMT_MAX_COLS", "-1");
    println!("{}", run.engineered);

    let features = &stock_predictor.methods().settings.features;
    if config.show_correlations {
        println!("{}", CorrelationReport::volatility(&run.engineered, features)?);
        println!("{}", CorrelationReport::moving_average(&run.engineered, features)?);
    }

    let evaluation = &run.evaluation;
    if config.show_coefficients {
        print!("{}", evaluation.model.summary());
    }
    println!("R^2 score is {}", evaluation.metrics.r2);
    println!("RMSE: {}", evaluation.metrics.rmse);
    println!("{:<12} {:>14} {:>14}", "date", "actual", "predicted");
    for (date, actual, predicted) in evaluation.dated_head(5) {
        println!("{:<12} {:>14.4} {:>14.4}", date.to_string(), actual, predicted);
    }

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;
    write_chart(
        &config.output_dir,
        "volatility.svg",
        &volatility_chart(&run.engineered, features)?,
    )?;
    write_chart(
        &config.output_dir,
        "actual_vs_predicted.svg",
        &actual_vs_predicted_chart(evaluation)?,
    )?;
    Ok(())
}
