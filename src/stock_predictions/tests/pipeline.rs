use std::io::Write;

use chrono::{Duration, NaiveDate};
use stock_predictions::charts::{actual_vs_predicted_chart, volatility_chart};
use stock_predictions::form::{FormInputs, FormState, PredictorState};
use stock_predictions::market_data::CsvPriceSource;
use stock_predictions::predictor::analysis::{CorrelationReport, FeatureError, FeatureSettings};
use stock_predictions::predictor::api::{PredictionError, PredictionSettings};
use stock_predictions::predictor::regression::RegressionPredictor;
use stock_predictions::StockPredictor;

fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, 4).unwrap()
}

fn write_prices(rows: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "date,open,high,low,close,adjusted,volume").unwrap();
    for i in 0..rows {
        let date = first_day() + Duration::days(i as i64);
        let price = 90.0 + (i as f64 / 11.0).sin() * 6.0 + i as f64 * 0.08;
        writeln!(
            file,
            "{},{:.4},{:.4},{:.4},{:.4},{:.4},{}",
            date.format("%Y-%m-%d"),
            price - 0.2,
            price + 1.1,
            price - 1.3,
            price,
            price * 0.99,
            1_000_000 + i * 10
        )
        .unwrap();
    }
    file
}

fn settings(seed: u64) -> PredictionSettings {
    PredictionSettings {
        ticker: "GOOGL".to_string(),
        start: first_day(),
        end: first_day() + Duration::days(1000),
        features: FeatureSettings::default(),
        test_ratio: 0.2,
        seed,
    }
}

#[test]
fn csv_prices_flow_through_the_whole_pipeline() {
    let file = write_prices(320);
    let predictor = StockPredictor::new(RegressionPredictor::new(
        CsvPriceSource::new(file.path()),
        settings(25),
    ));
    let run = predictor.update_predictions().unwrap();

    assert_eq!(run.engineered.height(), 120);
    assert!(run.engineered.get_columns().iter().all(|s| s.null_count() == 0));
    assert_eq!(run.evaluation.actual.len(), 24);
    assert_eq!(run.evaluation.train_targets.len(), 96);
    assert!(run.evaluation.metrics.rmse.is_finite());

    let features = FeatureSettings::default();
    let correlations = CorrelationReport::volatility(&run.engineered, &features).unwrap();
    for name in features.volatility_columns() {
        let own = correlations.get(&name, &name).unwrap();
        assert!((own - 1.0).abs() < 1e-9);
    }

    assert!(volatility_chart(&run.engineered, &features).unwrap().contains("<svg"));
    assert!(actual_vs_predicted_chart(&run.evaluation).unwrap().contains("<svg"));
}

#[test]
fn market_trained_form_matches_batch_model() {
    let file = write_prices(300);
    let run = StockPredictor::new(RegressionPredictor::new(
        CsvPriceSource::new(file.path()),
        settings(25),
    ))
    .update_predictions()
    .unwrap();
    let model = run.evaluation.model.clone();

    let state = PredictorState::from_evaluation(run.evaluation, "Google").unwrap();
    let inputs = FormInputs::default();
    let expected = model.predict_one(&inputs.features()).unwrap();
    match state.compute(inputs).unwrap() {
        FormState::Computed {
            prediction, text, ..
        } => {
            assert_eq!(prediction, expected);
            assert_eq!(text, format!("Predicted Google Stock Price: ${:.2}", expected));
        }
        FormState::Idle => panic!("expected a computed state"),
    }
}

#[test]
fn dates_outside_the_window_are_ignored() {
    let file = write_prices(320);
    let mut narrow = settings(25);
    narrow.end = first_day() + Duration::days(99);
    let result = StockPredictor::new(RegressionPredictor::new(
        CsvPriceSource::new(file.path()),
        narrow,
    ))
    .update_predictions();
    assert!(matches!(
        result,
        Err(PredictionError::FeatureError(FeatureError::NotEnoughRows {
            rows: 100,
            warm_up: 200
        }))
    ));
}
