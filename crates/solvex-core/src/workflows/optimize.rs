use crate::core::chem::descriptors::{DescriptorProvider, FeatureVector, SmilesDescriptors};
use crate::core::chem::solvents::resolve_solvent;
use crate::core::store::{ModelStore, StoreError};
use crate::engine::config::SearchConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::search::{ConditionCandidate, grid_search};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("No trained model found at '{location}'. Run `solvex train` first.")]
    NoTrainedModel { location: String },

    #[error("Invalid structure: '{smiles}' could not be parsed or described")]
    InvalidStructure { smiles: String },

    #[error("No solvent/temperature pair produced a prediction ({attempted} attempted)")]
    NoViableCandidates { attempted: usize },

    #[error("Failed to load the trained model: {source}")]
    Store {
        #[from]
        source: StoreError,
    },

    #[error(transparent)]
    Engine(EngineError),
}

impl From<EngineError> for OptimizeError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::NoViableCandidates { attempted } => Self::NoViableCandidates { attempted },
            other => Self::Engine(other),
        }
    }
}

/// Best conditions for one query structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub smiles: String,
    pub model_name: String,
    pub best_solvent: String,
    pub best_temperature_k: f64,
    pub best_temperature_c: f64,
    pub predicted_log_s: f64,
    /// `10^logS`, in mol/L.
    pub solubility_mol_l: f64,
    pub top_candidates: Vec<ConditionCandidate>,
    pub evaluated: usize,
    pub skipped: usize,
}

/// Finds the solvent and temperature with the highest predicted logS for
/// `config.smiles`, using the pipeline held by `store`.
#[instrument(skip_all, name = "optimize_workflow", fields(smiles = %config.smiles))]
pub fn run(
    config: &SearchConfig,
    store: &dyn ModelStore,
    reporter: &ProgressReporter,
) -> Result<OptimizationResult, OptimizeError> {
    run_with(config, store, &SmilesDescriptors, reporter)
}

/// Like [`run`], with a caller-supplied descriptor provider.
pub fn run_with<P>(
    config: &SearchConfig,
    store: &dyn ModelStore,
    provider: &P,
    reporter: &ProgressReporter,
) -> Result<OptimizationResult, OptimizeError>
where
    P: DescriptorProvider + ?Sized,
{
    let pipeline = store.load().map_err(|e| match e {
        StoreError::NotFound { .. } => OptimizeError::NoTrainedModel {
            location: store.location(),
        },
        other => OptimizeError::from(other),
    })?;

    let descriptors = match provider.describe(&config.smiles) {
        FeatureVector::Valid(descriptors) => descriptors,
        FeatureVector::Invalid => {
            return Err(OptimizeError::InvalidStructure {
                smiles: config.smiles.clone(),
            });
        }
    };

    let solvents: Vec<String> = config.solvents.iter().map(|s| resolve_solvent(s)).collect();
    let outcome = reporter.phase("Condition search", || {
        grid_search(
            &pipeline,
            &descriptors,
            &solvents,
            &config.temperatures,
            config.top_k,
            reporter,
        )
    })?;

    let best = outcome.best;
    info!(
        solvent = %best.solvent,
        temperature_k = best.temperature_k,
        log_s = best.predicted_log_s,
        "Found optimal conditions."
    );

    Ok(OptimizationResult {
        smiles: config.smiles.clone(),
        model_name: pipeline.model_name,
        solubility_mol_l: 10f64.powf(best.predicted_log_s),
        best_solvent: best.solvent,
        best_temperature_k: best.temperature_k,
        best_temperature_c: best.temperature_c,
        predicted_log_s: best.predicted_log_s,
        top_candidates: outcome.ranked,
        evaluated: outcome.evaluated,
        skipped: outcome.skipped,
    })
}
