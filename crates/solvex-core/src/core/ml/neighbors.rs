use super::regressor::{FittedRegressor, ModelError, Regressor, check_training_shape, matrix_rows};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// k-nearest-neighbor regression with uniform weights and Euclidean distance.
#[derive(Debug, Clone, Copy)]
pub struct KNeighbors {
    pub k: usize,
}

impl Default for KNeighbors {
    fn default() -> Self {
        Self { k: 5 }
    }
}

impl Regressor for KNeighbors {
    fn id(&self) -> &'static str {
        "knn"
    }

    fn name(&self) -> &'static str {
        "KNeighborsRegressor"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedRegressor, ModelError> {
        check_training_shape(x, y)?;
        if self.k == 0 {
            return Err(ModelError::InvalidParameter(
                "n_neighbors must be at least 1".to_string(),
            ));
        }
        if self.k > x.nrows() {
            return Err(ModelError::TooFewSamples {
                k: self.k,
                samples: x.nrows(),
            });
        }
        Ok(FittedRegressor::Neighbors(NeighborsModel {
            k: self.k,
            samples: matrix_rows(x),
            targets: y.iter().copied().collect(),
        }))
    }
}

/// The fitted model keeps the whole training partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborsModel {
    pub k: usize,
    pub samples: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl NeighborsModel {
    pub fn n_features(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    /// Mean target of the `k` closest training samples. Equidistant samples are
    /// ranked by their position in the training data.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut distances: Vec<(f64, usize)> = self
            .samples
            .iter()
            .enumerate()
            .map(|(index, sample)| {
                let d2: f64 = sample.iter().zip(row).map(|(a, b)| (a - b).powi(2)).sum();
                (d2, index)
            })
            .collect();

        let k = self.k.min(distances.len());
        if k == 0 {
            return f64::NAN;
        }
        let by_distance = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        if k < distances.len() {
            distances.select_nth_unstable_by(k - 1, by_distance);
        }
        distances[..k]
            .iter()
            .map(|&(_, index)| self.targets[index])
            .sum::<f64>()
            / k as f64
    }
}
