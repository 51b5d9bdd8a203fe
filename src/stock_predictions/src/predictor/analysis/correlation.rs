use std::fmt;

use ::analysis::abstract_data::abstract_classes::AnalysisToolKit;
use ::analysis::{AnalysisMethods, NDArrayHelper};
use nalgebra::DMatrix;
use polars::prelude::DataFrame;

use crate::predictor::analysis::api::{FeatureError, FeatureSettings, LOG_RETURNS_COLUMN};

/// Labelled Pearson correlation matrix. Diagnostic only.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationReport {
    pub columns: Vec<String>,
    pub matrix: DMatrix<f64>,
}

impl CorrelationReport {
    pub fn compute(df: &DataFrame, columns: &[String]) -> Result<Self, FeatureError> {
        let data = NDArrayHelper {}.dataframe_to_matrix(df, columns)?;
        let matrix = AnalysisMethods {}.correlation_matrix(&data);
        Ok(Self {
            columns: columns.to_vec(),
            matrix,
        })
    }

    /// Log returns against every rolling volatility.
    pub fn volatility(df: &DataFrame, settings: &FeatureSettings) -> Result<Self, FeatureError> {
        let mut columns = vec![LOG_RETURNS_COLUMN.to_string()];
        columns.extend(settings.volatility_columns());
        Self::compute(df, &columns)
    }

    /// Log returns against every moving average.
    pub fn moving_average(df: &DataFrame, settings: &FeatureSettings) -> Result<Self, FeatureError> {
        let mut columns = vec![LOG_RETURNS_COLUMN.to_string()];
        columns.extend(settings.moving_average_columns());
        Self::compute(df, &columns)
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == row)?;
        let j = self.columns.iter().position(|c| c == column)?;
        Some(self.matrix[(i, j)])
    }
}

impl fmt::Display for CorrelationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.columns.iter().map(String::len).max().unwrap_or(0).max(9);
        write!(f, "{:width$}", "", width = width)?;
        for name in &self.columns {
            write!(f, " {:>width$}", name, width = width)?;
        }
        writeln!(f)?;
        for (i, name) in self.columns.iter().enumerate() {
            write!(f, "{:width$}", name, width = width)?;
            for j in 0..self.columns.len() {
                write!(f, " {:>width$.6}", self.matrix[(i, j)], width = width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
