use crate::core::chem::descriptors::Descriptors;
use serde::{Deserialize, Serialize};

/// Numeric predictors, in the column order used by the scaler.
pub const NUMERIC_FEATURES: [&str; 6] = [
    "temperature_k",
    "mol_weight",
    "logp",
    "tpsa",
    "h_donors",
    "h_acceptors",
];

/// The single categorical predictor.
pub const CATEGORICAL_FEATURE: &str = "solvent";

pub const TARGET: &str = "log_s";

/// Column names a pipeline was trained on, persisted alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub categorical: Vec<String>,
    pub numeric: Vec<String>,
    pub target: String,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            categorical: vec![CATEGORICAL_FEATURE.to_string()],
            numeric: NUMERIC_FEATURES.iter().map(|name| name.to_string()).collect(),
            target: TARGET.to_string(),
        }
    }
}

/// One row of predictors, as seen by a trained pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub solvent: String,
    pub temperature_k: f64,
    pub mol_weight: f64,
    pub logp: f64,
    pub tpsa: f64,
    pub h_donors: f64,
    pub h_acceptors: f64,
}

impl ModelInput {
    pub fn new(solvent: impl Into<String>, temperature_k: f64, descriptors: &Descriptors) -> Self {
        Self {
            solvent: solvent.into(),
            temperature_k,
            mol_weight: descriptors.mol_weight,
            logp: descriptors.logp,
            tpsa: descriptors.tpsa,
            h_donors: f64::from(descriptors.h_donors),
            h_acceptors: f64::from(descriptors.h_acceptors),
        }
    }

    /// Numeric predictors in [`NUMERIC_FEATURES`] order.
    pub fn numeric(&self) -> [f64; NUMERIC_FEATURES.len()] {
        [
            self.temperature_k,
            self.mol_weight,
            self.logp,
            self.tpsa,
            self.h_donors,
            self.h_acceptors,
        ]
    }

    pub fn is_complete(&self) -> bool {
        !self.solvent.is_empty() && self.numeric().iter().all(|value| value.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub input: ModelInput,
    pub target: f64,
}

/// Rows ready for model selection: every predictor and the target are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<TrainingRow>,
}

impl FeatureTable {
    /// Builds a table, silently skipping rows with a missing predictor or target.
    pub fn from_rows(rows: impl IntoIterator<Item = TrainingRow>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .filter(|row| row.input.is_complete() && row.target.is_finite())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[TrainingRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &ModelInput> {
        self.rows.iter().map(|row| &row.input)
    }

    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.target).collect()
    }

    /// A new table holding the rows at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            rows: indices
                .iter()
                .filter_map(|&index| self.rows.get(index).cloned())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors() -> Descriptors {
        Descriptors {
            mol_weight: 46.07,
            logp: -0.0014,
            tpsa: 20.23,
            h_donors: 1,
            h_acceptors: 1,
            rule_of_five: 1,
        }
    }

    #[test]
    fn numeric_follows_feature_order() {
        let input = ModelInput::new("O", 298.0, &descriptors());
        assert_eq!(input.numeric(), [298.0, 46.07, -0.0014, 20.23, 1.0, 1.0]);
    }

    #[test]
    fn from_rows_skips_incomplete_rows() {
        let good = TrainingRow {
            input: ModelInput::new("O", 298.0, &descriptors()),
            target: -1.0,
        };
        let mut missing_temperature = good.clone();
        missing_temperature.input.temperature_k = f64::NAN;
        let mut missing_solvent = good.clone();
        missing_solvent.input.solvent.clear();
        let mut missing_target = good.clone();
        missing_target.target = f64::NAN;

        let table = FeatureTable::from_rows([
            good.clone(),
            missing_temperature,
            missing_solvent,
            missing_target,
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0], good);
    }

    #[test]
    fn subset_preserves_requested_order() {
        let rows = (0..4).map(|i| TrainingRow {
            input: ModelInput::new("O", 290.0 + i as f64, &descriptors()),
            target: i as f64,
        });
        let table = FeatureTable::from_rows(rows);
        let subset = table.subset(&[3, 1]);
        assert_eq!(subset.targets(), vec![3.0, 1.0]);
    }

    #[test]
    fn default_schema_lists_all_predictors() {
        let schema = FeatureSchema::default();
        assert_eq!(schema.categorical, vec!["solvent"]);
        assert_eq!(schema.numeric.len(), 6);
        assert_eq!(schema.target, "log_s");
    }
}
