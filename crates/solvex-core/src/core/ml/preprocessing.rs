use super::dataset::{CATEGORICAL_FEATURE, FeatureTable, ModelInput, NUMERIC_FEATURES};
use super::regressor::ModelError;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What the encoder does with a category it never saw during fitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownCategory {
    /// Encode as all zeros.
    #[default]
    Ignore,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted; column `i` of the encoding is `categories[i]`.
    pub categories: Vec<String>,
    pub policy: UnknownCategory,
}

impl OneHotEncoder {
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>, policy: UnknownCategory) -> Self {
        let categories: BTreeSet<&str> = values.into_iter().collect();
        Self {
            categories: categories.into_iter().map(str::to_string).collect(),
            policy,
        }
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Column of `value` in the encoding, or `None` when it is unknown and ignored.
    pub fn column_of(&self, value: &str) -> Result<Option<usize>, ModelError> {
        match self
            .categories
            .binary_search_by(|category| category.as_str().cmp(value))
        {
            Ok(column) => Ok(Some(column)),
            Err(_) => match self.policy {
                UnknownCategory::Ignore => Ok(None),
                UnknownCategory::Error => Err(ModelError::UnknownCategory {
                    feature: CATEGORICAL_FEATURE.to_string(),
                    category: value.to_string(),
                }),
            },
        }
    }
}

/// Zero-mean, unit-variance scaling with population standard deviations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    /// A zero-variance column keeps a scale of 1.
    pub scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[[f64; NUMERIC_FEATURES.len()]]) -> Self {
        let n = rows.len().max(1) as f64;
        let width = NUMERIC_FEATURES.len();
        let mut means = vec![0.0; width];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value / n;
            }
        }
        let mut scales = vec![0.0; width];
        for row in rows {
            for ((scale, value), mean) in scales.iter_mut().zip(row).zip(&means) {
                *scale += (value - mean).powi(2) / n;
            }
        }
        for scale in &mut scales {
            *scale = if *scale > 0.0 { scale.sqrt() } else { 1.0 };
        }
        Self { means, scales }
    }

    pub fn transform_value(&self, column: usize, value: f64) -> f64 {
        (value - self.means[column]) / self.scales[column]
    }
}

/// The fitted transform in front of every regressor: the one-hot solvent block
/// followed by the scaled numeric predictors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub encoder: OneHotEncoder,
    pub scaler: StandardScaler,
}

impl Preprocessor {
    /// Fits on `table` only; callers pass the training partition.
    pub fn fit(table: &FeatureTable, policy: UnknownCategory) -> Self {
        let encoder = OneHotEncoder::fit(table.inputs().map(|input| input.solvent.as_str()), policy);
        let numeric: Vec<_> = table.inputs().map(ModelInput::numeric).collect();
        Self {
            encoder,
            scaler: StandardScaler::fit(&numeric),
        }
    }

    pub fn output_width(&self) -> usize {
        self.encoder.width() + NUMERIC_FEATURES.len()
    }

    pub fn transform<'a, I>(&self, inputs: I) -> Result<DMatrix<f64>, ModelError>
    where
        I: IntoIterator<Item = &'a ModelInput>,
        I::IntoIter: ExactSizeIterator,
    {
        let inputs = inputs.into_iter();
        let n_rows = inputs.len();
        let one_hot = self.encoder.width();
        let mut x = DMatrix::zeros(n_rows, self.output_width());

        for (row, input) in inputs.enumerate() {
            if let Some(column) = self.encoder.column_of(&input.solvent)? {
                x[(row, column)] = 1.0;
            }
            for (offset, value) in input.numeric().into_iter().enumerate() {
                x[(row, one_hot + offset)] = self.scaler.transform_value(offset, value);
            }
        }
        Ok(x)
    }
}
