use super::regressor::{FittedRegressor, ModelError, Regressor, check_training_shape};
use super::tree::{FeatureSource, RegressionTree, TreeBuilder, TreeParams, squared_loss_gradients};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Bagged CART trees, each grown to purity on its own bootstrap sample.
///
/// Tree `t` draws its sample from `StdRng::seed_from_u64(seed + t)`, so the fitted
/// forest does not depend on thread scheduling.
#[derive(Debug, Clone, Copy)]
pub struct RandomForest {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl RandomForest {
    fn grow_tree(&self, index: usize, x: &DMatrix<f64>, grad: &[f64], hess: &[f64]) -> RegressionTree {
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(index as u64));
        let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            ..TreeParams::default()
        };
        TreeBuilder::new(FeatureSource::Exact(x), &params).grow(grad, hess, sample)
    }
}

impl Regressor for RandomForest {
    fn id(&self) -> &'static str {
        "random-forest"
    }

    fn name(&self) -> &'static str {
        "RandomForestRegressor"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedRegressor, ModelError> {
        check_training_shape(x, y)?;
        if self.n_trees == 0 || self.min_samples_leaf == 0 {
            return Err(ModelError::InvalidParameter(
                "random forest needs at least one tree and one sample per leaf".to_string(),
            ));
        }

        let targets: Vec<f64> = y.iter().copied().collect();
        let (grad, hess) = squared_loss_gradients(&vec![0.0; targets.len()], &targets);

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..self.n_trees;

        #[cfg(feature = "parallel")]
        let iterator = (0..self.n_trees).into_par_iter();

        let trees: Vec<RegressionTree> = iterator
            .map(|index| self.grow_tree(index, x, &grad, &hess))
            .collect();

        Ok(FittedRegressor::Forest(ForestModel {
            trees,
            n_features: x.ncols(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub trees: Vec<RegressionTree>,
    pub n_features: usize,
}

impl ForestModel {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        self.trees.iter().map(|tree| tree.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (DMatrix<f64>, DVector<f64>) {
        let x = DMatrix::from_fn(40, 1, |i, _| i as f64);
        let y = DVector::from_fn(40, |i, _| if i < 20 { -2.0 } else { 2.0 });
        (x, y)
    }

    #[test]
    fn forest_is_reproducible_for_fixed_seed() {
        let (x, y) = step_data();
        let forest = RandomForest {
            n_trees: 10,
            ..RandomForest::default()
        };
        let first = forest.fit(&x, &y).unwrap();
        let second = forest.fit(&x, &y).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn forest_learns_a_step() {
        let (x, y) = step_data();
        let forest = RandomForest {
            n_trees: 25,
            ..RandomForest::default()
        };
        let model = forest.fit(&x, &y).unwrap();
        assert!((model.predict_row(&[2.0]) + 2.0).abs() < 0.5);
        assert!((model.predict_row(&[37.0]) - 2.0).abs() < 0.5);
    }

    #[test]
    fn different_seeds_give_different_forests() {
        let x = DMatrix::from_fn(30, 2, |i, j| ((i * 7 + j * 3) % 13) as f64);
        let y = DVector::from_fn(30, |i, _| (i % 5) as f64);
        let a = RandomForest { n_trees: 5, seed: 1, ..RandomForest::default() };
        let b = RandomForest { n_trees: 5, seed: 2, ..RandomForest::default() };
        assert_ne!(a.fit(&x, &y).unwrap(), b.fit(&x, &y).unwrap());
    }

    #[test]
    fn zero_trees_is_rejected() {
        let (x, y) = step_data();
        let forest = RandomForest {
            n_trees: 0,
            ..RandomForest::default()
        };
        assert!(matches!(forest.fit(&x, &y), Err(ModelError::InvalidParameter(_))));
    }
}
