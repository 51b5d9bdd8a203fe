use crate::abstract_data::abstract_classes::{AnalysisError, AnalysisToolKit, LinearModel};
pub mod abstract_data;
pub mod regression;
pub mod split;

pub use regression::RegressionMetrics;
pub use split::TrainTestSplit;

use nalgebra::{DMatrix, DVector};
use ndarray::Array2;
use num_traits::Float;
use polars::prelude::*;

pub struct AnalysisMethods {}

/// Applies `statistic` to every trailing window that holds `window` non-null values.
fn rolling_apply<T, F>(
    values: &[Option<T>],
    window: usize,
    statistic: F,
) -> Result<Vec<Option<T>>, AnalysisError>
where
    T: Float,
    F: Fn(&[T]) -> Option<T>,
{
    if window == 0 {
        return Err(AnalysisError::EmptyWindow);
    }
    let mut output = Vec::with_capacity(values.len());
    let mut buffer: Vec<T> = Vec::with_capacity(window);
    for end in 0..values.len() {
        if end + 1 < window {
            output.push(None);
            continue;
        }
        let trailing = &values[end + 1 - window..=end];
        if trailing.iter().all(Option::is_some) {
            buffer.clear();
            buffer.extend(trailing.iter().flatten().copied());
            output.push(statistic(&buffer));
        } else {
            output.push(None);
        }
    }
    Ok(output)
}

impl AnalysisToolKit for AnalysisMethods {
    fn rolling_mean<T: Float>(
        &self,
        values: &[Option<T>],
        window: usize,
    ) -> Result<Vec<Option<T>>, AnalysisError> {
        let n = T::from(window).ok_or(AnalysisError::ConversionError)?;
        rolling_apply(values, window, |w| {
            Some(w.iter().fold(T::zero(), |acc, &x| acc + x) / n)
        })
    }

    fn rolling_std<T: Float>(
        &self,
        values: &[Option<T>],
        window: usize,
    ) -> Result<Vec<Option<T>>, AnalysisError> {
        let n = T::from(window).ok_or(AnalysisError::ConversionError)?;
        rolling_apply(values, window, |w| {
            if w.len() < 2 {
                return None;
            }
            let mean = w.iter().fold(T::zero(), |acc, &x| acc + x) / n;
            let squares = w
                .iter()
                .fold(T::zero(), |acc, &x| acc + (x - mean) * (x - mean));
            Some((squares / (n - T::one())).sqrt())
        })
    }

    fn log_returns<T: Float>(&self, prices: &[Option<T>]) -> Vec<Option<T>> {
        let mut output = Vec::with_capacity(prices.len());
        if prices.is_empty() {
            return output;
        }
        output.push(None);
        output.extend(prices.windows(2).map(|pair| match (pair[0], pair[1]) {
            (Some(previous), Some(current)) => {
                let ratio = (current / previous).log10();
                if ratio.is_finite() {
                    Some(ratio)
                } else {
                    None
                }
            }
            _ => None,
        }));
        output
    }

    fn shift<T: Copy>(&self, values: &[Option<T>], periods: usize) -> Vec<Option<T>> {
        (0..values.len())
            .map(|i| if i < periods { None } else { values[i - periods] })
            .collect()
    }

    fn correlation_matrix(&self, data: &DMatrix<f64>) -> DMatrix<f64> {
        let columns = data.ncols();
        if data.nrows() == 0 {
            return DMatrix::identity(columns, columns);
        }
        let n = data.nrows() as f64;
        let moments: Vec<(f64, f64)> = (0..columns)
            .map(|j| {
                let column = data.column(j);
                (column.mean(), column.variance().sqrt())
            })
            .collect();

        DMatrix::from_fn(columns, columns, |i, j| {
            if i == j {
                return 1.0;
            }
            let (mean_i, std_i) = moments[i];
            let (mean_j, std_j) = moments[j];
            if std_i < 1e-12 || std_j < 1e-12 {
                return 0.0;
            }
            let covariance = data
                .column(i)
                .iter()
                .zip(data.column(j).iter())
                .map(|(a, b)| (a - mean_i) * (b - mean_j))
                .sum::<f64>()
                / n;
            covariance / (std_i * std_j)
        })
    }

    fn fit_regression(
        &self,
        independent_variables: &DMatrix<f64>,
        dependent_variables: &DVector<f64>,
        feature_names: Vec<String>,
    ) -> Result<LinearModel, AnalysisError> {
        LinearModel::fit(independent_variables, dependent_variables, feature_names)
    }

    fn create_predictions(
        &self,
        model: &LinearModel,
        independent_variables: &DMatrix<f64>,
    ) -> Result<DVector<f64>, AnalysisError> {
        model.predict(independent_variables)
    }
}

pub struct NDArrayHelper {}

impl NDArrayHelper {
    pub fn convert_ndarray_matrix_to_nalgebra(&self, array: Array2<f64>) -> DMatrix<f64> {
        let (nrows, ncols) = array.dim();
        DMatrix::from_row_iterator(nrows, ncols, array.into_iter())
    }

    /// Copies the named columns of `df` into a row-per-observation matrix.
    pub fn dataframe_to_matrix(
        &self,
        df: &DataFrame,
        columns: &[String],
    ) -> Result<DMatrix<f64>, AnalysisError> {
        let selected = df.select(columns)?;
        let array = selected.to_ndarray::<Float64Type>(IndexOrder::C)?;
        Ok(self.convert_ndarray_matrix_to_nalgebra(array))
    }

    pub fn column_to_vector(&self, df: &DataFrame, column: &str) -> Result<DVector<f64>, AnalysisError> {
        let values = df.column(column)?.cast(&DataType::Float64)?;
        let values: Vec<f64> = values
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Ok(DVector::from_vec(values))
    }
}
