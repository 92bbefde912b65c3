//! Additive tree ensembles fitted stagewise on squared-loss gradients.
//!
//! Three variants share [`fit_boosted`] and differ only in their tree parameters and
//! in whether candidate thresholds come from sorted raw values or 255-bin histograms.

use super::regressor::{FittedRegressor, ModelError, Regressor, check_training_shape, matrix_rows};
use super::tree::{
    BinnedMatrix, FeatureSource, Growth, RegressionTree, TreeBuilder, TreeParams,
    squared_loss_gradients,
};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedModel {
    pub base_score: f64,
    /// Already baked into the leaf values; kept for inspection.
    pub learning_rate: f64,
    pub trees: Vec<RegressionTree>,
    pub n_features: usize,
}

impl BoostedModel {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|tree| tree.predict_row(row)).sum::<f64>()
    }
}

fn fit_boosted(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    rounds: usize,
    learning_rate: f64,
    params: &TreeParams,
    histogram_bins: Option<usize>,
) -> Result<FittedRegressor, ModelError> {
    check_training_shape(x, y)?;
    if rounds == 0 || !(learning_rate > 0.0) {
        return Err(ModelError::InvalidParameter(format!(
            "boosting needs at least one round and a positive learning rate (rounds = {rounds}, learning rate = {learning_rate})"
        )));
    }

    let binned = histogram_bins.map(|bins| BinnedMatrix::new(x, bins));
    let source = match &binned {
        Some(binned) => FeatureSource::Binned(binned),
        None => FeatureSource::Exact(x),
    };
    let builder = TreeBuilder::new(source, params);

    let targets: Vec<f64> = y.iter().copied().collect();
    let base_score = y.mean();
    let mut predictions = vec![base_score; targets.len()];
    let rows = matrix_rows(x);
    let mut trees = Vec::with_capacity(rounds);

    for round in 0..rounds {
        let (grad, hess) = squared_loss_gradients(&predictions, &targets);
        let mut tree = builder.grow(&grad, &hess, (0..targets.len()).collect());
        tree.scale(learning_rate);
        for (prediction, row) in predictions.iter_mut().zip(&rows) {
            *prediction += tree.predict_row(row);
        }
        trace!(round, leaves = tree.leaf_count(), "Boosting round complete");
        trees.push(tree);
    }

    Ok(FittedRegressor::Boosted(BoostedModel {
        base_score,
        learning_rate,
        trees,
        n_features: x.ncols(),
    }))
}

/// First-order gradient boosting: shallow CART trees fitted to residuals.
#[derive(Debug, Clone, Copy)]
pub struct GradientBoosting {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
        }
    }
}

impl Regressor for GradientBoosting {
    fn id(&self) -> &'static str {
        "gradient-boosting"
    }

    fn name(&self) -> &'static str {
        "GradientBoostingRegressor"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedRegressor, ModelError> {
        let params = TreeParams {
            max_depth: Some(self.max_depth),
            ..TreeParams::default()
        };
        fit_boosted(x, y, self.n_estimators, self.learning_rate, &params, None)
    }
}

/// Second-order boosting with L2 leaf regularization and a minimum hessian per child.
#[derive(Debug, Clone, Copy)]
pub struct RegularizedBoosting {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub lambda: f64,
    pub gamma: f64,
    pub min_child_weight: f64,
}

impl Default for RegularizedBoosting {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
        }
    }
}

impl Regressor for RegularizedBoosting {
    fn id(&self) -> &'static str {
        "regularized-boosting"
    }

    fn name(&self) -> &'static str {
        "RegularizedBoostingRegressor"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedRegressor, ModelError> {
        let params = TreeParams {
            max_depth: Some(self.max_depth),
            min_child_weight: self.min_child_weight,
            lambda: self.lambda,
            gamma: self.gamma,
            ..TreeParams::default()
        };
        fit_boosted(x, y, self.n_estimators, self.learning_rate, &params, None)
    }
}

/// Leaf-wise boosting over quantized features.
#[derive(Debug, Clone, Copy)]
pub struct HistogramBoosting {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub num_leaves: usize,
    pub min_samples_leaf: usize,
    pub min_child_weight: f64,
    pub max_bins: usize,
}

impl Default for HistogramBoosting {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            num_leaves: 31,
            min_samples_leaf: 20,
            min_child_weight: 1e-3,
            max_bins: 255,
        }
    }
}

impl Regressor for HistogramBoosting {
    fn id(&self) -> &'static str {
        "histogram-boosting"
    }

    fn name(&self) -> &'static str {
        "HistogramBoostingRegressor"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedRegressor, ModelError> {
        if self.num_leaves < 2 {
            return Err(ModelError::InvalidParameter(format!(
                "num_leaves must be at least 2, got {}",
                self.num_leaves
            )));
        }
        let params = TreeParams {
            max_leaves: Some(self.num_leaves),
            min_samples_leaf: self.min_samples_leaf,
            min_child_weight: self.min_child_weight,
            growth: Growth::LeafWise,
            ..TreeParams::default()
        };
        fit_boosted(
            x,
            y,
            self.n_estimators,
            self.learning_rate,
            &params,
            Some(self.max_bins),
        )
    }
}
