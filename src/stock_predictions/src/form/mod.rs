pub mod routes;

use ::analysis::abstract_data::abstract_classes::LinearModel;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::charts::prediction_scatter_chart;
use crate::predictor::analysis::FeatureSettings;
use crate::predictor::api::{Evaluation, PredictionError};

pub use routes::router;

pub const SYNTHETIC_ROWS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub default: f64,
}

pub const FORM_FIELDS: [FormField; 5] = [
    FormField {
        name: "ma_10",
        label: "10-day Moving Average",
        default: 0.5,
    },
    FormField {
        name: "ma_200",
        label: "200-day Moving Average",
        default: 0.5,
    },
    FormField {
        name: "rolling_volatility_20",
        label: "20-day Rolling Volatility",
        default: 0.02,
    },
    FormField {
        name: "rolling_volatility_50",
        label: "50-day Rolling Volatility",
        default: 0.03,
    },
    FormField {
        name: "rolling_volatility_200",
        label: "200-day Rolling Volatility",
        default: 0.03,
    },
];

pub const INPUT_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormInputs {
    pub ma_10: f64,
    pub ma_200: f64,
    pub rolling_volatility_20: f64,
    pub rolling_volatility_50: f64,
    pub rolling_volatility_200: f64,
}

impl Default for FormInputs {
    fn default() -> Self {
        Self::from_features(FORM_FIELDS.map(|field| field.default))
    }
}

impl FormInputs {
    pub fn from_features(values: [f64; 5]) -> Self {
        Self {
            ma_10: values[0],
            ma_200: values[1],
            rolling_volatility_20: values[2],
            rolling_volatility_50: values[3],
            rolling_volatility_200: values[4],
        }
    }

    pub fn features(&self) -> [f64; 5] {
        [
            self.ma_10,
            self.ma_200,
            self.rolling_volatility_20,
            self.rolling_volatility_50,
            self.rolling_volatility_200,
        ]
    }
}

/// Either nothing has been submitted yet, or both outputs exist for the last
/// submission. Every submission recomputes both outputs.
#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Idle,
    Computed {
        inputs: FormInputs,
        prediction: f64,
        text: String,
        chart: String,
    },
}

/// Read-only state shared by every request.
#[derive(Debug, Clone)]
pub struct PredictorState {
    pub model: LinearModel,
    pub training_actual: DVector<f64>,
    pub training_predicted: DVector<f64>,
    pub company: String,
}

impl PredictorState {
    pub fn from_training(
        model: LinearModel,
        features: &DMatrix<f64>,
        targets: DVector<f64>,
        company: &str,
    ) -> Result<Self, PredictionError> {
        let training_predicted = model.predict(features)?;
        Ok(Self {
            model,
            training_actual: targets,
            training_predicted,
            company: company.to_string(),
        })
    }

    /// Fits on seeded random features in [0, 1) and targets in [1000, 1200).
    pub fn synthetic(seed: u64, company: &str) -> Result<Self, PredictionError> {
        let (features, targets) = synthetic_training_data(SYNTHETIC_ROWS, seed);
        let names = FeatureSettings::default().model_features();
        let model = LinearModel::fit(&features, &targets, names)?;
        info!(rows = SYNTHETIC_ROWS, seed, "trained form model on synthetic data");
        Self::from_training(model, &features, targets, company)
    }

    /// Reuses the model fitted on the training partition of real prices.
    pub fn from_evaluation(evaluation: Evaluation, company: &str) -> Result<Self, PredictionError> {
        info!(
            rows = evaluation.train_targets.len(),
            r2 = evaluation.metrics.r2,
            "trained form model on market data"
        );
        Self::from_training(
            evaluation.model,
            &evaluation.train_features,
            evaluation.train_targets,
            company,
        )
    }

    pub fn predict(&self, inputs: &FormInputs) -> Result<f64, PredictionError> {
        Ok(self.model.predict_one(&inputs.features())?)
    }

    pub fn prediction_text(&self, prediction: f64) -> String {
        format!("Predicted {} Stock Price: ${:.2}", self.company, prediction)
    }

    pub fn compute(&self, inputs: FormInputs) -> Result<FormState, PredictionError> {
        let prediction = self.predict(&inputs)?;
        let chart = prediction_scatter_chart(&self.training_actual, &self.training_predicted)?;
        Ok(FormState::Computed {
            inputs,
            prediction,
            text: self.prediction_text(prediction),
            chart,
        })
    }
}

pub fn synthetic_training_data(rows: usize, seed: u64) -> (DMatrix<f64>, DVector<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let features = DMatrix::from_fn(rows, FORM_FIELDS.len(), |_, _| rng.gen::<f64>());
    let targets = DVector::from_fn(rows, |_, _| rng.gen::<f64>() * 200.0 + 1000.0);
    (features, targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn defaults_match_form_fields() {
        let inputs = FormInputs::default();
        assert_eq!(inputs.features(), [0.5, 0.5, 0.02, 0.03, 0.03]);
        let names: Vec<&str> = FORM_FIELDS.iter().map(|f| f.name).collect();
        assert_eq!(names, FeatureSettings::default().model_features());
    }

    #[test]
    fn synthetic_data_is_seeded_and_bounded() {
        let (x, y) = synthetic_training_data(SYNTHETIC_ROWS, 42);
        let (x2, y2) = synthetic_training_data(SYNTHETIC_ROWS, 42);
        assert_eq!(x, x2);
        assert_eq!(y, y2);
        assert_eq!(x.shape(), (100, 5));
        assert!(x.iter().all(|&v| (0.0..1.0).contains(&v)));
        assert!(y.iter().all(|&v| (1000.0..1200.0).contains(&v)));
    }

    #[test]
    fn prediction_is_dot_product_plus_intercept() {
        let state = PredictorState::synthetic(42, "Google").unwrap();
        let inputs = FormInputs::default();
        let expected: f64 = inputs
            .features()
            .iter()
            .zip(state.model.coefficients.iter())
            .map(|(a, b)| a * b)
            .sum::<f64>()
            + state.model.intercept;
        assert_abs_diff_eq!(state.predict(&inputs).unwrap(), expected, epsilon = 1e-9);
        assert_eq!(state.predict(&inputs).unwrap(), state.predict(&inputs).unwrap());
    }

    #[test]
    fn compute_produces_text_and_chart() {
        let state = PredictorState::synthetic(42, "Google").unwrap();
        match state.compute(FormInputs::default()).unwrap() {
            FormState::Computed {
                inputs,
                prediction,
                text,
                chart,
            } => {
                assert_eq!(inputs, FormInputs::default());
                assert_eq!(text, format!("Predicted Google Stock Price: ${:.2}", prediction));
                assert!(chart.contains("<svg"));
            }
            FormState::Idle => panic!("expected a computed state"),
        }
    }

    #[test]
    fn prediction_text_has_two_decimals() {
        let state = PredictorState::synthetic(1, "Google").unwrap();
        assert_eq!(state.prediction_text(1099.456), "Predicted Google Stock Price: $1099.46");
    }

    #[test]
    fn frozen_model_with_known_coefficients() {
        let model = LinearModel {
            coefficients: DVector::from_vec(vec![10.0, 20.0, 100.0, 200.0, 300.0]),
            intercept: 1000.0,
            feature_names: FeatureSettings::default().model_features(),
        };
        let features = DMatrix::from_row_slice(2, 5, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.5, 0.4, 0.3, 0.2, 0.1]);
        let targets = model.predict(&features).unwrap();
        let state = PredictorState::from_training(model, &features, targets, "Google").unwrap();
        let prediction = state.predict(&FormInputs::default()).unwrap();
        // 5 + 10 + 2 + 6 + 9 + 1000
        assert_abs_diff_eq!(prediction, 1032.0, epsilon = 1e-9);
    }
}
