use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::abstract_data::abstract_classes::AnalysisError;

/// Row indices of a shuffled train/test partition.
///
/// The test partition holds `ceil(n_rows * test_ratio)` rows. The same
/// `(n_rows, test_ratio, seed)` always yields the same partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    pub fn new(n_rows: usize, test_ratio: f64, seed: u64) -> Result<Self, AnalysisError> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(AnalysisError::InvalidRatio(test_ratio));
        }
        let n_test = (n_rows as f64 * test_ratio).ceil() as usize;
        if n_test == 0 || n_test >= n_rows {
            return Err(AnalysisError::TooFewRows { rows: n_rows });
        }

        let mut indices: Vec<usize> = (0..n_rows).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
        let train = indices.split_off(n_test);

        Ok(Self {
            train,
            test: indices,
        })
    }

    pub fn train_rows(&self, matrix: &DMatrix<f64>) -> DMatrix<f64> {
        matrix.select_rows(self.train.iter())
    }

    pub fn test_rows(&self, matrix: &DMatrix<f64>) -> DMatrix<f64> {
        matrix.select_rows(self.test.iter())
    }

    pub fn train_values(&self, vector: &DVector<f64>) -> DVector<f64> {
        vector.select_rows(self.train.iter())
    }

    pub fn test_values(&self, vector: &DVector<f64>) -> DVector<f64> {
        vector.select_rows(self.test.iter())
    }
}
