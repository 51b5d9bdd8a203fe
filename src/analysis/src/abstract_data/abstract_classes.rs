use nalgebra::{DMatrix, DVector};
use num_traits::Float;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("window length must be positive")]
    EmptyWindow,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cannot fit a model on an empty design matrix")]
    EmptyDesign,

    #[error("least squares solve failed: {0}")]
    SolveError(String),

    #[error("test ratio must lie strictly between 0 and 1, got {0}")]
    InvalidRatio(f64),

    #[error("{rows} rows cannot be split into non-empty train and test partitions")]
    TooFewRows { rows: usize },

    #[error("numeric conversion failed")]
    ConversionError,

    #[error(transparent)]
    ShapeError(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}

/// Ordinary least squares fit: `y = x * coefficients + intercept`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub coefficients: DVector<f64>,
    pub intercept: f64,
    pub feature_names: Vec<String>,
}

pub trait AnalysisToolKit {
    /// Trailing mean; `None` until `window` non-null values are available.
    fn rolling_mean<T: Float>(
        &self,
        values: &[Option<T>],
        window: usize,
    ) -> Result<Vec<Option<T>>, AnalysisError>;

    /// Trailing sample standard deviation (one delta degree of freedom).
    fn rolling_std<T: Float>(
        &self,
        values: &[Option<T>],
        window: usize,
    ) -> Result<Vec<Option<T>>, AnalysisError>;

    /// Base-10 logarithm of consecutive price ratios.
    fn log_returns<T: Float>(&self, prices: &[Option<T>]) -> Vec<Option<T>>;

    fn shift<T: Copy>(&self, values: &[Option<T>], periods: usize) -> Vec<Option<T>>;

    /// Pearson correlation between the columns of `data`.
    fn correlation_matrix(&self, data: &DMatrix<f64>) -> DMatrix<f64>;

    fn fit_regression(
        &self,
        independent_variables: &DMatrix<f64>,
        dependent_variables: &DVector<f64>,
        feature_names: Vec<String>,
    ) -> Result<LinearModel, AnalysisError>;

    fn create_predictions(
        &self,
        model: &LinearModel,
        independent_variables: &DMatrix<f64>,
    ) -> Result<DVector<f64>, AnalysisError>;
}
