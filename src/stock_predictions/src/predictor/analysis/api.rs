use ::analysis::abstract_data::abstract_classes::AnalysisError;
use polars::prelude::PolarsError;
use thiserror::Error;

use crate::market_data::ADJUSTED_COLUMN;

pub const LOG_RETURNS_COLUMN: &str = "log_returns";

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("{rows} rows leave nothing after a warm-up of {warm_up} rows")]
    NotEnoughRows { rows: usize, warm_up: usize },
}

/// Window lengths used by the feature builder.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSettings {
    /// Column every feature is derived from.
    pub price_column: String,
    pub moving_average_windows: Vec<usize>,
    /// Number of lagged copies of the log return (`lag1..=lagN`).
    pub lags: usize,
    pub volatility_windows: Vec<usize>,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            price_column: ADJUSTED_COLUMN.to_string(),
            moving_average_windows: vec![10, 200],
            lags: 3,
            volatility_windows: vec![20, 50, 200],
        }
    }
}

impl FeatureSettings {
    pub fn moving_average_column(window: usize) -> String {
        format!("ma_{}", window)
    }

    pub fn volatility_column(window: usize) -> String {
        format!("rolling_volatility_{}", window)
    }

    pub fn lag_column(lag: usize) -> String {
        format!("lag{}", lag)
    }

    pub fn moving_average_columns(&self) -> Vec<String> {
        self.moving_average_windows
            .iter()
            .map(|&w| Self::moving_average_column(w))
            .collect()
    }

    pub fn volatility_columns(&self) -> Vec<String> {
        self.volatility_windows
            .iter()
            .map(|&w| Self::volatility_column(w))
            .collect()
    }

    /// Regression inputs: moving averages followed by volatilities.
    pub fn model_features(&self) -> Vec<String> {
        let mut features = self.moving_average_columns();
        features.extend(self.volatility_columns());
        features
    }

    /// Index of the first row on which every derived column is defined.
    ///
    /// A moving average over `w` prices is defined from row `w - 1`; anything
    /// computed from log returns starts one row later since the first return
    /// is undefined.
    pub fn warm_up_rows(&self) -> usize {
        let moving_average = self
            .moving_average_windows
            .iter()
            .map(|&w| w.saturating_sub(1))
            .max()
            .unwrap_or(0);
        let volatility = self.volatility_windows.iter().copied().max().unwrap_or(0);
        let lags = self.lags + 1;
        moving_average.max(volatility).max(lags)
    }
}
