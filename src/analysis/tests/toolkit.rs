use analysis::abstract_data::abstract_classes::AnalysisToolKit;
use analysis::{AnalysisMethods, RegressionMetrics, TrainTestSplit};
use approx::assert_abs_diff_eq;
use nalgebra::{DMatrix, DVector};

#[test]
fn split_fit_and_score_a_noiseless_target() {
    let methods = AnalysisMethods {};
    let n = 50;
    let x = DMatrix::from_fn(n, 2, |i, j| ((i * (j + 3)) % 17) as f64 + j as f64 * 0.5);
    let y = DVector::from_fn(n, |i, _| 4.0 + 2.0 * x[(i, 0)] - 0.5 * x[(i, 1)]);

    let split = TrainTestSplit::new(n, 0.2, 25).unwrap();
    assert_eq!(split.test.len(), 10);
    let model = methods
        .fit_regression(
            &split.train_rows(&x),
            &split.train_values(&y),
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap();
    let predicted = methods.create_predictions(&model, &split.test_rows(&x)).unwrap();
    let metrics = RegressionMetrics::calculate(&split.test_values(&y), &predicted).unwrap();

    assert_abs_diff_eq!(model.intercept, 4.0, epsilon = 1e-6);
    assert_abs_diff_eq!(metrics.r2, 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(metrics.rmse, 0.0, epsilon = 1e-6);
}

#[test]
fn features_line_up_after_warm_up() {
    let methods = AnalysisMethods {};
    let prices: Vec<Option<f64>> = (0..30).map(|i| Some(50.0 + i as f64)).collect();
    let averages = methods.rolling_mean(&prices, 5).unwrap();
    let returns = methods.log_returns(&prices);
    let volatility = methods.rolling_std(&returns, 5).unwrap();
    let lagged = methods.shift(&returns, 1);

    let first_complete = (0..prices.len())
        .find(|&i| averages[i].is_some() && volatility[i].is_some() && lagged[i].is_some())
        .unwrap();
    // Volatility needs five returns, and the first return needs a previous price.
    assert_eq!(first_complete, 5);
    assert_abs_diff_eq!(averages[first_complete].unwrap(), 53.0, epsilon = 1e-12);
}
