use super::prepare::prepare_dataset;
use crate::core::chem::descriptors::SmilesDescriptors;
use crate::core::data::clean::CleaningReport;
use crate::core::data::features::write_featurized_csv;
use crate::core::data::stats::DatasetStats;
use crate::core::store::ModelStore;
use crate::engine::config::TrainingConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::selection::{SelectionReport, build_roster, select_best};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub cleaning: CleaningReport,
    pub stats: DatasetStats,
    pub usable_rows: usize,
    pub selection: SelectionReport,
    pub model_id: String,
    pub model_name: String,
    pub model_location: String,
}

/// Prepares the dataset, selects the best regressor and replaces the stored pipeline
/// with it. Nothing is written to `store` unless some candidate succeeds.
#[instrument(skip_all, name = "training_workflow")]
pub fn run(
    config: &TrainingConfig,
    store: &dyn ModelStore,
    reporter: &ProgressReporter,
) -> Result<TrainingReport, EngineError> {
    let roster = build_roster(&config.selection.models)?;
    let prepared = prepare_dataset(&config.dataset, &SmilesDescriptors, reporter)?;

    if let Some(path) = &config.features_out {
        write_featurized_csv(path, &prepared.records)?;
        info!(path = %path.display(), "Wrote featurized dataset.");
    }

    reporter.report(Progress::PhaseStart {
        name: "Model selection",
    });
    let outcome = select_best(&prepared.table, &roster, &config.selection, reporter)?;
    reporter.report(Progress::PhaseFinish);

    reporter.phase("Saving model", || store.save(&outcome.pipeline))?;

    Ok(TrainingReport {
        cleaning: prepared.cleaning,
        stats: prepared.stats,
        usable_rows: prepared.table.len(),
        selection: outcome.report,
        model_id: outcome.pipeline.model_id,
        model_name: outcome.pipeline.model_name,
        model_location: store.location(),
    })
}
