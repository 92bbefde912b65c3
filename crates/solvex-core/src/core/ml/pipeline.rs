use super::dataset::{FeatureSchema, FeatureTable, ModelInput};
use super::preprocessing::{Preprocessor, UnknownCategory};
use super::regressor::{FittedRegressor, ModelError, Regressor};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

pub const PIPELINE_FORMAT_VERSION: u32 = 1;

/// Anything that can score a single row of predictors.
pub trait SolubilityModel {
    fn predict_one(&self, input: &ModelInput) -> Result<f64, ModelError>;
}

/// Preprocessing and a fitted regressor, persisted and loaded as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedPipeline {
    pub format_version: u32,
    pub model_id: String,
    pub model_name: String,
    pub schema: FeatureSchema,
    pub preprocessor: Preprocessor,
    pub regressor: FittedRegressor,
}

impl TrainedPipeline {
    /// Fits the preprocessor and `regressor` on `train`.
    pub fn fit(
        regressor: &dyn Regressor,
        train: &FeatureTable,
        policy: UnknownCategory,
    ) -> Result<Self, ModelError> {
        if train.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        let preprocessor = Preprocessor::fit(train, policy);
        let x = preprocessor.transform(train.rows().iter().map(|row| &row.input))?;
        let y = DVector::from_vec(train.targets());
        let fitted = regressor.fit(&x, &y)?;
        Ok(Self::assemble(regressor, preprocessor, fitted))
    }

    /// Bundles an already fitted preprocessor and regressor.
    pub fn assemble(regressor: &dyn Regressor, preprocessor: Preprocessor, fitted: FittedRegressor) -> Self {
        Self {
            format_version: PIPELINE_FORMAT_VERSION,
            model_id: regressor.id().to_string(),
            model_name: regressor.name().to_string(),
            schema: FeatureSchema::default(),
            preprocessor,
            regressor: fitted,
        }
    }

    pub fn predict(&self, inputs: &[ModelInput]) -> Result<Vec<f64>, ModelError> {
        let x: DMatrix<f64> = self.preprocessor.transform(inputs)?;
        Ok(self.regressor.predict(&x)?.iter().copied().collect())
    }

    pub fn predict_table(&self, table: &FeatureTable) -> Result<Vec<f64>, ModelError> {
        let x = self
            .preprocessor
            .transform(table.rows().iter().map(|row| &row.input))?;
        Ok(self.regressor.predict(&x)?.iter().copied().collect())
    }
}

impl SolubilityModel for TrainedPipeline {
    fn predict_one(&self, input: &ModelInput) -> Result<f64, ModelError> {
        let prediction = self
            .predict(std::slice::from_ref(input))?
            .into_iter()
            .next()
            .ok_or(ModelError::NonFinitePrediction)?;
        if prediction.is_finite() {
            Ok(prediction)
        } else {
            Err(ModelError::NonFinitePrediction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ml::dataset::TrainingRow;
    use crate::core::ml::linear::LinearRegression;

    fn row(solvent: &str, temperature_k: f64, target: f64) -> TrainingRow {
        TrainingRow {
            input: ModelInput {
                solvent: solvent.to_string(),
                temperature_k,
                mol_weight: 100.0,
                logp: 1.0,
                tpsa: 20.0,
                h_donors: 1.0,
                h_acceptors: 1.0,
            },
            target,
        }
    }

    fn table() -> FeatureTable {
        // logS = 0.01·T − 3 in water, one unit higher in ethanol.
        FeatureTable::from_rows([
            row("O", 280.0, -0.2),
            row("O", 300.0, 0.0),
            row("O", 320.0, 0.2),
            row("CCO", 280.0, 0.8),
            row("CCO", 300.0, 1.0),
            row("CCO", 320.0, 1.2),
        ])
    }

    #[test]
    fn pipeline_predicts_through_preprocessing() {
        let pipeline = TrainedPipeline::fit(&LinearRegression, &table(), UnknownCategory::Ignore).unwrap();
        assert_eq!(pipeline.model_id, "linear");
        let prediction = pipeline.predict_one(&row("CCO", 310.0, 0.0).input).unwrap();
        assert!((prediction - 1.1).abs() < 1e-9);
    }

    #[test]
    fn unknown_solvent_still_predicts() {
        let pipeline = TrainedPipeline::fit(&LinearRegression, &table(), UnknownCategory::Ignore).unwrap();
        assert!(pipeline.predict_one(&row("CS(C)=O", 300.0, 0.0).input).is_ok());
    }

    #[test]
    fn pipeline_round_trips_through_json_without_refitting() {
        let pipeline = TrainedPipeline::fit(&LinearRegression, &table(), UnknownCategory::Ignore).unwrap();
        let json = serde_json::to_string(&pipeline).unwrap();
        let restored: TrainedPipeline = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, pipeline);
        let query = [row("O", 290.0, 0.0).input];
        assert_eq!(restored.predict(&query).unwrap(), pipeline.predict(&query).unwrap());
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = TrainedPipeline::fit(&LinearRegression, &FeatureTable::default(), UnknownCategory::Ignore)
            .unwrap_err();
        assert_eq!(err, ModelError::EmptyTrainingSet);
    }
}
