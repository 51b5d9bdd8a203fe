pub mod charts;
pub mod config;
pub mod form;
pub mod market_data;
pub mod predictor;

use polars::prelude::DataFrame;
use tracing::info;

use crate::predictor::api::{Evaluation, PredictionError, Predictor};

/// Engineered table and its evaluation from one pass of the pipeline.
#[derive(Debug, Clone)]
pub struct PredictionRun {
    pub engineered: DataFrame,
    pub evaluation: Evaluation,
}

pub struct StockPredictor<T: Predictor> {
    prediction_methods: T,
}

impl<T: Predictor> StockPredictor<T> {
    pub fn new(methods: T) -> Self {
        StockPredictor {
            prediction_methods: methods,
        }
    }

    pub fn methods(&self) -> &T {
        &self.prediction_methods
    }

    /// Fetch, engineer, split, fit and score.
    pub fn update_predictions(&self) -> Result<PredictionRun, PredictionError> {
        let cleaned = self.prediction_methods.retrieve_formatted_data()?;
        let engineered = self.prediction_methods.build_prediction_data(cleaned)?;
        info!(rows = engineered.height(), "engineered feature table");
        let evaluation = self.prediction_methods.create_predictions(&engineered)?;
        Ok(PredictionRun {
            engineered,
            evaluation,
        })
    }
}
