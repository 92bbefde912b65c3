use crate::core::chem::descriptors::{DescriptorProvider, SmilesDescriptors};
use crate::core::data::clean::{CleaningReport, clean};
use crate::core::data::features::{FeaturizedRecord, featurize, feature_table, write_featurized_csv};
use crate::core::data::record::{DatasetError, load_records};
use crate::core::data::stats::DatasetStats;
use crate::core::ml::dataset::FeatureTable;
use crate::engine::config::{DatasetConfig, PrepareConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use std::path::PathBuf;
use tracing::{info, instrument};

/// A loaded, cleaned and featurized dataset.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub records: Vec<FeaturizedRecord>,
    pub cleaning: CleaningReport,
    pub stats: DatasetStats,
    pub table: FeatureTable,
}

impl PreparedDataset {
    pub fn invalid_structures(&self) -> usize {
        self.records.iter().filter(|r| !r.features.is_valid()).count()
    }
}

#[derive(Debug, Clone)]
pub struct PrepareReport {
    pub cleaning: CleaningReport,
    pub stats: DatasetStats,
    pub invalid_structures: usize,
    pub usable_rows: usize,
    pub output_path: PathBuf,
    pub stats_path: Option<PathBuf>,
}

pub(crate) fn prepare_dataset<P>(
    config: &DatasetConfig,
    provider: &P,
    reporter: &ProgressReporter,
) -> Result<PreparedDataset, EngineError>
where
    P: DescriptorProvider + ?Sized,
{
    let raw = reporter.phase("Loading dataset", || load_records(&config.input_path))?;
    let (cleaned, cleaning) = clean(raw, config.log_s_window);
    let stats = DatasetStats::compute(&cleaned);

    let records = reporter.phase("Computing descriptors", || featurize(cleaned, provider));
    let table = feature_table(&records, config.solvent_label);

    Ok(PreparedDataset {
        records,
        cleaning,
        stats,
        table,
    })
}

/// Loads, cleans and featurizes the raw table, then writes it (and optionally a
/// statistics report) to disk.
#[instrument(skip_all, name = "prepare_workflow")]
pub fn run(config: &PrepareConfig, reporter: &ProgressReporter) -> Result<PrepareReport, EngineError> {
    let prepared = prepare_dataset(&config.dataset, &SmilesDescriptors, reporter)?;

    write_featurized_csv(&config.output_path, &prepared.records)?;
    info!(path = %config.output_path.display(), rows = prepared.records.len(), "Wrote featurized dataset.");

    if let Some(stats_path) = &config.stats_path {
        prepared
            .stats
            .write_report(stats_path)
            .map_err(|source| DatasetError::Io {
                path: stats_path.display().to_string(),
                source,
            })?;
        info!(path = %stats_path.display(), "Wrote dataset statistics.");
    }

    Ok(PrepareReport {
        invalid_structures: prepared.invalid_structures(),
        usable_rows: prepared.table.len(),
        cleaning: prepared.cleaning,
        stats: prepared.stats,
        output_path: config.output_path.clone(),
        stats_path: config.stats_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{DatasetConfigBuilder, PrepareConfigBuilder};
    use std::fs;
    use tempfile::tempdir;

    const RAW: &str = "\
smiles,temperature_k,solvent,solvent_smiles,solubility_mol_l,solubility_mol_kg,log_s,compound_name
CC(=O)Nc1ccc(O)cc1,298.15,water,O,,,-1.03,paracetamol
CC(=O)Nc1ccc(O)cc1,298.15,water,O,,,-1.03,paracetamol
CC(=O)Nc1ccc(O)cc1,298.15,ethanol,CCO,,,-0.3,paracetamol
c1ccccc1,298.15,water,O,,,-1.64,benzene
C1CC,298.15,water,O,,,-1.0,broken
CCCCCCCCCCCCCCCC,298.15,water,O,,,-15.0,hexadecane
";

    #[test]
    fn prepare_writes_table_and_stats() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("raw.csv");
        fs::write(&input, RAW).unwrap();

        let config = PrepareConfigBuilder::new()
            .dataset(DatasetConfigBuilder::new().input_path(&input).build().unwrap())
            .output_path(dir.path().join("out").join("features.csv"))
            .stats_path(Some(dir.path().join("stats.txt")))
            .build()
            .unwrap();
        let report = run(&config, &ProgressReporter::new()).unwrap();

        assert_eq!(report.cleaning.input_rows, 6);
        assert_eq!(report.cleaning.duplicates_removed, 1);
        assert_eq!(report.cleaning.out_of_range_removed, 1);
        assert_eq!(report.invalid_structures, 1);
        assert_eq!(report.usable_rows, 3);

        let written = fs::read_to_string(&config.output_path).unwrap();
        assert!(written.starts_with("smiles,"));
        assert_eq!(written.lines().count(), 5);

        let stats = fs::read_to_string(dir.path().join("stats.txt")).unwrap();
        assert!(stats.contains("Compounds: 3"));
    }

    #[test]
    fn missing_input_is_a_dataset_error() {
        let dir = tempdir().unwrap();
        let config = PrepareConfigBuilder::new()
            .dataset(
                DatasetConfigBuilder::new()
                    .input_path(dir.path().join("nope.csv"))
                    .build()
                    .unwrap(),
            )
            .output_path(dir.path().join("features.csv"))
            .build()
            .unwrap();
        let err = run(&config, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Dataset {
                source: DatasetError::NotFound { .. }
            }
        ));
    }
}
