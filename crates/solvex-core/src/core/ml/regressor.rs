use super::boosting::{BoostedModel, GradientBoosting, HistogramBoosting, RegularizedBoosting};
use super::forest::{ForestModel, RandomForest};
use super::linear::{Lasso, LinearModel, LinearRegression, Ridge};
use super::neighbors::{KNeighbors, NeighborsModel};
use super::svm::{Svr, SupportVectorModel};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Cannot fit with zero samples")]
    EmptyTrainingSet,
    #[error("Feature matrix has {rows} rows but the target has {targets} values")]
    ShapeMismatch { rows: usize, targets: usize },
    #[error("Expected {expected} features, got {found}")]
    FeatureMismatch { expected: usize, found: usize },
    #[error("n_neighbors = {k} exceeds the number of training samples ({samples})")]
    TooFewSamples { k: usize, samples: usize },
    #[error("Unknown category '{category}' for feature '{feature}'")]
    UnknownCategory { feature: String, category: String },
    #[error("Numerical failure: {0}")]
    Numerical(String),
    #[error("Invalid hyperparameter: {0}")]
    InvalidParameter(String),
    #[error("Prediction is not finite")]
    NonFinitePrediction,
    #[error("Cannot split {rows} rows with test fraction {fraction}")]
    InvalidSplit { rows: usize, fraction: f64 },
}

/// An untrained estimator in the model roster.
pub trait Regressor: Send + Sync {
    /// Stable identifier used in configuration (e.g. `"random-forest"`).
    fn id(&self) -> &'static str;
    /// Display name used in summaries.
    fn name(&self) -> &'static str;
    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedRegressor, ModelError>;
}

/// A fitted estimator, serializable as part of a trained pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FittedRegressor {
    Linear(LinearModel),
    Neighbors(NeighborsModel),
    SupportVector(SupportVectorModel),
    Forest(ForestModel),
    Boosted(BoostedModel),
}

impl FittedRegressor {
    pub fn n_features(&self) -> usize {
        match self {
            Self::Linear(m) => m.n_features(),
            Self::Neighbors(m) => m.n_features(),
            Self::SupportVector(m) => m.n_features(),
            Self::Forest(m) => m.n_features(),
            Self::Boosted(m) => m.n_features(),
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            Self::Linear(m) => m.predict_row(row),
            Self::Neighbors(m) => m.predict_row(row),
            Self::SupportVector(m) => m.predict_row(row),
            Self::Forest(m) => m.predict_row(row),
            Self::Boosted(m) => m.predict_row(row),
        }
    }

    pub fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, ModelError> {
        if x.ncols() != self.n_features() {
            return Err(ModelError::FeatureMismatch {
                expected: self.n_features(),
                found: x.ncols(),
            });
        }
        let rows = matrix_rows(x);

        #[cfg(not(feature = "parallel"))]
        let iterator = rows.iter();

        #[cfg(feature = "parallel")]
        let iterator = rows.par_iter();

        let predictions: Vec<f64> = iterator.map(|row| self.predict_row(row)).collect();
        Ok(DVector::from_vec(predictions))
    }
}

/// Copies a matrix into row-major vectors.
pub(crate) fn matrix_rows(x: &DMatrix<f64>) -> Vec<Vec<f64>> {
    x.row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

pub(crate) fn check_training_shape(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), ModelError> {
    if x.nrows() == 0 {
        return Err(ModelError::EmptyTrainingSet);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::ShapeMismatch {
            rows: x.nrows(),
            targets: y.len(),
        });
    }
    Ok(())
}

/// Identifiers of the full roster, in evaluation order.
pub const ROSTER_IDS: [&str; 9] = [
    "linear",
    "lasso",
    "ridge",
    "knn",
    "svr",
    "random-forest",
    "gradient-boosting",
    "regularized-boosting",
    "histogram-boosting",
];

/// Builds the estimator registered under `id` with its default hyperparameters.
pub fn by_id(id: &str) -> Option<Box<dyn Regressor>> {
    let regressor: Box<dyn Regressor> = match id {
        "linear" => Box::new(LinearRegression),
        "lasso" => Box::new(Lasso::default()),
        "ridge" => Box::new(Ridge::default()),
        "knn" => Box::new(KNeighbors::default()),
        "svr" => Box::new(Svr::default()),
        "random-forest" => Box::new(RandomForest::default()),
        "gradient-boosting" => Box::new(GradientBoosting::default()),
        "regularized-boosting" => Box::new(RegularizedBoosting::default()),
        "histogram-boosting" => Box::new(HistogramBoosting::default()),
        _ => return None,
    };
    Some(regressor)
}

/// The full default roster, in evaluation order.
pub fn default_roster() -> Vec<Box<dyn Regressor>> {
    ROSTER_IDS.iter().filter_map(|id| by_id(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_ids_resolve_in_order() {
        let roster = default_roster();
        let ids: Vec<&str> = roster.iter().map(|r| r.id()).collect();
        assert_eq!(ids, ROSTER_IDS);
        assert!(by_id("xgboost").is_none());
    }

    #[test]
    fn fitted_regressor_serializes_with_kind_tag() {
        let x = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 2.0]);
        let y = DVector::from_vec(vec![1.0, 3.0, 5.0]);
        let fitted = LinearRegression.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&fitted).unwrap();
        assert!(json.contains("\"kind\":\"linear\""));
        let restored: FittedRegressor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, fitted);
    }

    #[test]
    fn predict_rejects_wrong_feature_count() {
        let x = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        let y = DVector::from_vec(vec![0.0, 1.0]);
        let fitted = LinearRegression.fit(&x, &y).unwrap();
        let wide = DMatrix::zeros(1, 3);
        assert_eq!(
            fitted.predict(&wide),
            Err(ModelError::FeatureMismatch {
                expected: 1,
                found: 3
            })
        );
    }
}
