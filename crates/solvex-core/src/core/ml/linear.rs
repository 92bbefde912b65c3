//! Linear estimators: ordinary least squares, L1 (lasso) and L2 (ridge) regularized.
//!
//! All three fit an unpenalized intercept by centring the design matrix and target,
//! solving for the coefficients on the centred data, and recovering the intercept
//! from the column means.

use super::regressor::{FittedRegressor, ModelError, Regressor, check_training_shape};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

struct Centred {
    x: DMatrix<f64>,
    y: DVector<f64>,
    x_mean: DVector<f64>,
    y_mean: f64,
}

fn centre(x: &DMatrix<f64>, y: &DVector<f64>) -> Centred {
    let x_mean = x.row_mean().transpose();
    let y_mean = y.mean();
    let mut xc = x.clone();
    for (j, mut column) in xc.column_iter_mut().enumerate() {
        column.add_scalar_mut(-x_mean[j]);
    }
    Centred {
        x: xc,
        y: y.add_scalar(-y_mean),
        x_mean,
        y_mean,
    }
}

fn finish(coefficients: DVector<f64>, centred: &Centred) -> Result<FittedRegressor, ModelError> {
    if coefficients.iter().any(|w| !w.is_finite()) {
        return Err(ModelError::Numerical(
            "solver produced non-finite coefficients".to_string(),
        ));
    }
    let intercept = centred.y_mean - centred.x_mean.dot(&coefficients);
    Ok(FittedRegressor::Linear(LinearModel {
        coefficients: coefficients.iter().copied().collect(),
        intercept,
    }))
}

/// Ordinary least squares, solved through the SVD pseudo-inverse so that collinear
/// columns (such as a full one-hot block next to the intercept) get the minimum-norm
/// solution instead of failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRegression;

impl Regressor for LinearRegression {
    fn id(&self) -> &'static str {
        "linear"
    }

    fn name(&self) -> &'static str {
        "LinearRegression"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedRegressor, ModelError> {
        check_training_shape(x, y)?;
        let centred = centre(x, y);
        let svd = centred.x.clone().svd(true, true);
        let eps = svd.singular_values.max() * 1e-12;
        let coefficients = svd
            .solve(&centred.y, eps.max(f64::EPSILON))
            .map_err(|e| ModelError::Numerical(e.to_string()))?;
        finish(coefficients, &centred)
    }
}

/// L2-regularized least squares: `(XᵀX + αI) w = Xᵀy` on centred data.
#[derive(Debug, Clone, Copy)]
pub struct Ridge {
    pub alpha: f64,
}

impl Default for Ridge {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

impl Regressor for Ridge {
    fn id(&self) -> &'static str {
        "ridge"
    }

    fn name(&self) -> &'static str {
        "Ridge"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedRegressor, ModelError> {
        check_training_shape(x, y)?;
        if self.alpha < 0.0 {
            return Err(ModelError::InvalidParameter(format!(
                "ridge alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        let centred = centre(x, y);
        let xt = centred.x.transpose();
        let n_features = x.ncols();
        let gram = &xt * &centred.x + DMatrix::<f64>::identity(n_features, n_features) * self.alpha;
        let rhs = &xt * &centred.y;

        let coefficients = match gram.clone().cholesky() {
            Some(cholesky) => cholesky.solve(&rhs),
            None => {
                debug!("Ridge system is not positive definite; falling back to SVD");
                gram.svd(true, true)
                    .solve(&rhs, 1e-12)
                    .map_err(|e| ModelError::Numerical(e.to_string()))?
            }
        };
        finish(coefficients, &centred)
    }
}

/// L1-regularized least squares minimising `1/(2n)·‖y − Xw‖² + α‖w‖₁` by cyclic
/// coordinate descent.
#[derive(Debug, Clone, Copy)]
pub struct Lasso {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for Lasso {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

impl Regressor for Lasso {
    fn id(&self) -> &'static str {
        "lasso"
    }

    fn name(&self) -> &'static str {
        "Lasso"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedRegressor, ModelError> {
        check_training_shape(x, y)?;
        if self.alpha < 0.0 {
            return Err(ModelError::InvalidParameter(format!(
                "lasso alpha must be non-negative, got {}",
                self.alpha
            )));
        }

        let centred = centre(x, y);
        let n_samples = x.nrows() as f64;
        let n_features = x.ncols();
        let threshold = self.alpha * n_samples;
        let column_norms: Vec<f64> = centred
            .x
            .column_iter()
            .map(|column| column.norm_squared())
            .collect();

        let mut w = DVector::<f64>::zeros(n_features);
        let mut residual = centred.y.clone();
        let mut converged = false;

        for iteration in 0..self.max_iter {
            let mut max_update = 0.0f64;
            let mut max_weight = 0.0f64;

            for j in 0..n_features {
                if column_norms[j] == 0.0 {
                    continue;
                }
                let column = centred.x.column(j);
                let w_old = w[j];
                let rho = column.dot(&residual) + column_norms[j] * w_old;
                let w_new = soft_threshold(rho, threshold) / column_norms[j];

                let delta = w_new - w_old;
                if delta != 0.0 {
                    residual.axpy(-delta, &column, 1.0);
                    w[j] = w_new;
                }
                max_update = max_update.max(delta.abs());
                max_weight = max_weight.max(w_new.abs());
            }

            if max_weight == 0.0 || max_update <= self.tol * max_weight {
                debug!(iterations = iteration + 1, "Lasso coordinate descent converged");
                converged = true;
                break;
            }
        }
        if !converged {
            debug!(max_iter = self.max_iter, "Lasso reached the iteration limit");
        }

        finish(w, &centred)
    }
}
