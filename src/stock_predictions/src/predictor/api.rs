use ::analysis::abstract_data::abstract_classes::{AnalysisError, LinearModel};
use ::analysis::{RegressionMetrics, TrainTestSplit};
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use polars::prelude::*;
use thiserror::Error;

use crate::market_data::{timestamp_to_date, DataError};
use crate::predictor::analysis::api::{FeatureError, FeatureSettings};

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("could not retrieve price data: {0}")]
    BuildDataError(#[from] DataError),

    #[error("feature engineering failed: {0}")]
    FeatureError(#[from] FeatureError),

    #[error("model training failed: {0}")]
    TrainModelError(#[from] AnalysisError),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error("chart rendering failed: {0}")]
    ChartError(String),
}

/// What to fetch and how to fit it.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSettings {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub features: FeatureSettings,
    pub test_ratio: f64,
    pub seed: u64,
}

/// A fitted model scored on its held-out rows.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub model: LinearModel,
    pub metrics: RegressionMetrics,
    pub split: TrainTestSplit,
    pub train_features: DMatrix<f64>,
    pub train_targets: DVector<f64>,
    /// Timestamps of the test rows, in split order.
    pub test_timestamps: Vec<i64>,
    pub actual: DVector<f64>,
    pub predicted: DVector<f64>,
}

impl Evaluation {
    /// First `n` test rows as `(timestamp, actual, predicted)`.
    pub fn head(&self, n: usize) -> Vec<(i64, f64, f64)> {
        self.test_timestamps
            .iter()
            .zip(self.actual.iter().zip(self.predicted.iter()))
            .take(n)
            .map(|(&ts, (&actual, &predicted))| (ts, actual, predicted))
            .collect()
    }

    /// Like `head`, keyed by trading date.
    pub fn dated_head(&self, n: usize) -> Vec<(NaiveDate, f64, f64)> {
        self.head(n)
            .into_iter()
            .filter_map(|(ts, actual, predicted)| {
                timestamp_to_date(ts).map(|date| (date, actual, predicted))
            })
            .collect()
    }

    /// Test rows ordered by date, for plotting.
    pub fn by_date(&self) -> Vec<(NaiveDate, f64, f64)> {
        let mut rows = self.dated_head(self.test_timestamps.len());
        rows.sort_by_key(|row| row.0);
        rows
    }
}

pub trait Predictor {
    fn retrieve_formatted_data(&self) -> Result<DataFrame, PredictionError>;
    fn build_prediction_data(&self, cleaned_data: DataFrame) -> Result<DataFrame, PredictionError>;
    fn create_predictions(&self, prediction_data: &DataFrame) -> Result<Evaluation, PredictionError>;
}
