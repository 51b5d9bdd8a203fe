use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::abstract_data::abstract_classes::{AnalysisError, LinearModel};

/// Singular values below this are treated as zero by the least squares solve.
const SINGULAR_VALUE_EPS: f64 = 1e-10;

impl LinearModel {
    /// Fits an intercept plus one coefficient per column of `x`.
    ///
    /// The design matrix `[1 | x]` is solved in the least squares sense through
    /// its singular value decomposition, so collinear features still produce
    /// the minimum norm solution instead of failing.
    pub fn fit(
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        feature_names: Vec<String>,
    ) -> Result<Self, AnalysisError> {
        if x.nrows() != y.len() {
            return Err(AnalysisError::DimensionMismatch {
                expected: x.nrows(),
                got: y.len(),
            });
        }
        if feature_names.len() != x.ncols() {
            return Err(AnalysisError::DimensionMismatch {
                expected: x.ncols(),
                got: feature_names.len(),
            });
        }
        if x.nrows() == 0 {
            return Err(AnalysisError::EmptyDesign);
        }

        let design = DMatrix::from_fn(x.nrows(), x.ncols() + 1, |i, j| {
            if j == 0 {
                1.0
            } else {
                x[(i, j - 1)]
            }
        });
        let svd = design.svd(true, true);
        let beta = svd
            .solve(y, SINGULAR_VALUE_EPS)
            .map_err(|e| AnalysisError::SolveError(e.to_string()))?;
        if beta.iter().any(|b| !b.is_finite()) {
            return Err(AnalysisError::SolveError(
                "solution contains non-finite values".to_string(),
            ));
        }

        let model = LinearModel {
            intercept: beta[0],
            coefficients: beta.rows(1, x.ncols()).into_owned(),
            feature_names,
        };
        debug!(intercept = model.intercept, coefficients = ?model.coefficients.as_slice(), "fitted linear model");
        Ok(model)
    }

    pub fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, AnalysisError> {
        if x.ncols() != self.coefficients.len() {
            return Err(AnalysisError::DimensionMismatch {
                expected: self.coefficients.len(),
                got: x.ncols(),
            });
        }
        Ok((x * &self.coefficients).add_scalar(self.intercept))
    }

    /// Prediction for a single observation: `features · coefficients + intercept`.
    pub fn predict_one(&self, features: &[f64]) -> Result<f64, AnalysisError> {
        if features.len() != self.coefficients.len() {
            return Err(AnalysisError::DimensionMismatch {
                expected: self.coefficients.len(),
                got: features.len(),
            });
        }
        let dot: f64 = features
            .iter()
            .zip(self.coefficients.iter())
            .map(|(value, coefficient)| value * coefficient)
            .sum();
        Ok(dot + self.intercept)
    }

    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Intercept: {:.6}\n", self.intercept));
        s.push_str("Coefficients:\n");
        for (name, coefficient) in self.feature_names.iter().zip(self.coefficients.iter()) {
            s.push_str(&format!("  {:24}: {:>14.6}\n", name, coefficient));
        }
        s
    }
}

/// Scores of a set of predictions against the observed targets.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    /// Coefficient of determination.
    pub r2: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    pub fn calculate(
        y_true: &DVector<f64>,
        y_pred: &DVector<f64>,
    ) -> Result<Self, AnalysisError> {
        if y_true.len() != y_pred.len() {
            return Err(AnalysisError::DimensionMismatch {
                expected: y_true.len(),
                got: y_pred.len(),
            });
        }
        if y_true.is_empty() {
            return Err(AnalysisError::EmptyDesign);
        }

        let mse = Self::mean_squared_error(y_true, y_pred);
        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            mae: Self::mean_absolute_error(y_true, y_pred),
            r2: Self::r_squared(y_true, y_pred),
            n_samples: y_true.len(),
        })
    }

    pub fn mean_squared_error(y_true: &DVector<f64>, y_pred: &DVector<f64>) -> f64 {
        let n = y_true.len() as f64;
        y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum::<f64>()
            / n
    }

    pub fn mean_absolute_error(y_true: &DVector<f64>, y_pred: &DVector<f64>) -> f64 {
        let n = y_true.len() as f64;
        y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).abs())
            .sum::<f64>()
            / n
    }

    /// R² = 1 - SS_res / SS_tot. A constant target scores 1.0 when matched
    /// exactly and 0.0 otherwise.
    pub fn r_squared(y_true: &DVector<f64>, y_pred: &DVector<f64>) -> f64 {
        let y_mean = y_true.mean();
        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum();
        let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean).powi(2)).sum();

        if ss_tot < 1e-12 {
            return if ss_res < 1e-12 { 1.0 } else { 0.0 };
        }
        1.0 - ss_res / ss_tot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("x{}", i)).collect()
    }

    fn perfect_fit_data() -> (DMatrix<f64>, DVector<f64>) {
        let x = DMatrix::from_row_slice(
            8,
            3,
            &[
                1.0, 0.5, 2.0, //
                2.0, 1.5, 0.0, //
                3.0, -1.0, 1.0, //
                4.0, 2.5, 3.0, //
                5.0, 0.0, -2.0, //
                6.0, 1.0, 4.0, //
                7.0, -2.0, 0.5, //
                8.0, 3.0, 1.5,
            ],
        );
        let y = DVector::from_fn(8, |i, _| 4.0 + 2.0 * x[(i, 0)] - 3.0 * x[(i, 1)] + 0.5 * x[(i, 2)]);
        (x, y)
    }

    #[test]
    fn fit_recovers_exact_coefficients() {
        let (x, y) = perfect_fit_data();
        let model = LinearModel::fit(&x, &y, names(3)).expect("fit should succeed");
        assert_abs_diff_eq!(model.intercept, 4.0, epsilon = 1e-8);
        assert_abs_diff_eq!(model.coefficients[0], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(model.coefficients[1], -3.0, epsilon = 1e-8);
        assert_abs_diff_eq!(model.coefficients[2], 0.5, epsilon = 1e-8);
    }

    #[test]
    fn perfect_fit_scores_one_and_zero_error() {
        let (x, y) = perfect_fit_data();
        let model = LinearModel::fit(&x, &y, names(3)).unwrap();
        let predictions = model.predict(&x).unwrap();
        let metrics = RegressionMetrics::calculate(&y, &predictions).unwrap();
        assert_abs_diff_eq!(metrics.r2, 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(metrics.rmse, 0.0, epsilon = 1e-8);
        assert_eq!(metrics.n_samples, 8);
    }

    #[test]
    fn predict_one_is_dot_product_plus_intercept() {
        let model = LinearModel {
            coefficients: DVector::from_vec(vec![1.0, -2.0, 0.5, 10.0, 3.0]),
            intercept: 7.0,
            feature_names: names(5),
        };
        let inputs = [0.5, 0.5, 0.02, 0.03, 0.03];
        let expected = 0.5 - 1.0 + 0.01 + 0.3 + 0.09 + 7.0;
        assert_abs_diff_eq!(model.predict_one(&inputs).unwrap(), expected, epsilon = 1e-12);
        assert_eq!(
            model.predict_one(&inputs).unwrap(),
            model.predict_one(&inputs).unwrap()
        );
    }

    #[test]
    fn fit_rejects_mismatched_shapes() {
        let x = DMatrix::from_element(4, 2, 1.0);
        let y = DVector::from_element(3, 1.0);
        assert!(matches!(
            LinearModel::fit(&x, &y, names(2)),
            Err(AnalysisError::DimensionMismatch { expected: 4, got: 3 })
        ));
        let empty = DMatrix::<f64>::zeros(0, 2);
        assert!(matches!(
            LinearModel::fit(&empty, &DVector::zeros(0), names(2)),
            Err(AnalysisError::EmptyDesign)
        ));
    }

    #[test]
    fn predict_rejects_wrong_feature_count() {
        let (x, y) = perfect_fit_data();
        let model = LinearModel::fit(&x, &y, names(3)).unwrap();
        assert!(model.predict(&DMatrix::zeros(2, 2)).is_err());
        assert!(model.predict_one(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn metrics_on_known_errors() {
        let y_true = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let y_pred = DVector::from_vec(vec![1.0, 2.0, 3.0, 6.0]);
        let metrics = RegressionMetrics::calculate(&y_true, &y_pred).unwrap();
        assert_abs_diff_eq!(metrics.mse, 1.0);
        assert_abs_diff_eq!(metrics.rmse, 1.0);
        assert_abs_diff_eq!(metrics.mae, 0.5);
        // SS_tot = 5, SS_res = 4
        assert_abs_diff_eq!(metrics.r2, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn constant_target_r_squared() {
        let y = DVector::from_element(3, 5.0);
        assert_eq!(RegressionMetrics::r_squared(&y, &y), 1.0);
        assert_eq!(RegressionMetrics::r_squared(&y, &DVector::from_element(3, 4.0)), 0.0);
    }

    #[test]
    fn summary_lists_every_feature() {
        let (x, y) = perfect_fit_data();
        let model = LinearModel::fit(&x, &y, names(3)).unwrap();
        let summary = model.summary();
        assert!(summary.contains("Intercept"));
        assert!(summary.contains("x0") && summary.contains("x1") && summary.contains("x2"));
    }
}
