use super::regressor::{FittedRegressor, ModelError, Regressor, check_training_shape, matrix_rows};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Above this many training rows kernel columns are recomputed on demand instead of
/// being held in a dense matrix.
const DENSE_KERNEL_LIMIT: usize = 4096;

/// Kernel width selection for the RBF kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gamma {
    /// `1 / (n_features · Var(X))`, computed over every entry of the training matrix.
    Scale,
    Value(f64),
}

/// Epsilon-insensitive support vector regression with an RBF kernel.
///
/// Solved in the dual by coordinate descent. The bias is folded into the kernel
/// (`K + 1`), which removes the equality constraint and leaves a box-constrained
/// problem on `β ∈ [−C, C]` with an L1 term of weight ε.
#[derive(Debug, Clone, Copy)]
pub struct Svr {
    pub c: f64,
    pub epsilon: f64,
    pub gamma: Gamma,
    pub tol: f64,
    pub max_epochs: usize,
}

impl Default for Svr {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.1,
            gamma: Gamma::Scale,
            tol: 1e-3,
            max_epochs: 200,
        }
    }
}

fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let d2: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    (-gamma * d2).exp()
}

fn scale_gamma(x: &DMatrix<f64>) -> f64 {
    let n = x.len() as f64;
    let mean = x.sum() / n;
    let variance = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if variance > 0.0 {
        1.0 / (x.ncols() as f64 * variance)
    } else {
        1.0
    }
}

/// Source of columns of the augmented kernel `Q = K + 1`.
enum KernelColumns<'a> {
    Dense(DMatrix<f64>),
    OnDemand { rows: &'a [Vec<f64>], gamma: f64 },
}

impl KernelColumns<'_> {
    fn diagonal(&self, i: usize) -> f64 {
        match self {
            Self::Dense(q) => q[(i, i)],
            Self::OnDemand { .. } => 2.0,
        }
    }

    fn column_into(&self, i: usize, out: &mut [f64]) {
        match self {
            Self::Dense(q) => {
                for (value, q) in out.iter_mut().zip(q.column(i).iter()) {
                    *value = *q;
                }
            }
            Self::OnDemand { rows, gamma } => {
                for (j, value) in out.iter_mut().enumerate() {
                    *value = rbf(&rows[i], &rows[j], *gamma) + 1.0;
                }
            }
        }
    }
}

impl Regressor for Svr {
    fn id(&self) -> &'static str {
        "svr"
    }

    fn name(&self) -> &'static str {
        "SVR"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<FittedRegressor, ModelError> {
        check_training_shape(x, y)?;
        if self.c <= 0.0 || self.epsilon < 0.0 {
            return Err(ModelError::InvalidParameter(format!(
                "SVR requires C > 0 and epsilon >= 0 (C = {}, epsilon = {})",
                self.c, self.epsilon
            )));
        }

        let gamma = match self.gamma {
            Gamma::Scale => scale_gamma(x),
            Gamma::Value(g) => g,
        };
        let rows = matrix_rows(x);
        let n = rows.len();

        let kernel = if n <= DENSE_KERNEL_LIMIT {
            KernelColumns::Dense(DMatrix::from_fn(n, n, |i, j| rbf(&rows[i], &rows[j], gamma) + 1.0))
        } else {
            KernelColumns::OnDemand { rows: &rows, gamma }
        };

        let mut beta = vec![0.0f64; n];
        // q_beta[i] = (Qβ)_i
        let mut q_beta = vec![0.0f64; n];
        let mut column = vec![0.0f64; n];

        for epoch in 0..self.max_epochs {
            let mut max_change = 0.0f64;
            for i in 0..n {
                let q_ii = kernel.diagonal(i);
                let s = q_beta[i] - q_ii * beta[i] - y[i];
                let unclipped = -soft_threshold(s, self.epsilon) / q_ii;
                let updated = unclipped.clamp(-self.c, self.c);
                let delta = updated - beta[i];
                if delta.abs() > 1e-12 {
                    kernel.column_into(i, &mut column);
                    for (qb, q) in q_beta.iter_mut().zip(&column) {
                        *qb += delta * q;
                    }
                    beta[i] = updated;
                }
                max_change = max_change.max(delta.abs());
            }
            if max_change < self.tol {
                debug!(epochs = epoch + 1, "SVR dual coordinate descent converged");
                break;
            }
        }

        drop(kernel);

        let mut support_vectors = Vec::new();
        let mut dual_coef = Vec::new();
        for (row, &b) in rows.into_iter().zip(&beta) {
            if b != 0.0 {
                support_vectors.push(row);
                dual_coef.push(b);
            }
        }
        let intercept = dual_coef.iter().sum();

        Ok(FittedRegressor::SupportVector(SupportVectorModel {
            gamma,
            support_vectors,
            dual_coef,
            intercept,
            n_features: x.ncols(),
        }))
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    value.signum() * (value.abs() - threshold).max(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportVectorModel {
    pub gamma: f64,
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
    pub n_features: usize,
}

impl SupportVectorModel {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .support_vectors
                .iter()
                .zip(&self.dual_coef)
                .map(|(sv, coef)| coef * rbf(sv, row, self.gamma))
                .sum::<f64>()
    }
}
