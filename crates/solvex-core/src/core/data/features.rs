use super::clean::CleanRecord;
use super::record::DatasetError;
use crate::core::chem::descriptors::{DescriptorProvider, FeatureVector};
use crate::core::ml::dataset::{FeatureTable, ModelInput, TrainingRow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Which raw column feeds the categorical solvent predictor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolventLabel {
    /// The solvent SMILES, which is also what the condition search queries with.
    #[default]
    Smiles,
    /// The free-text solvent name.
    Name,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeaturizedRecord {
    pub record: CleanRecord,
    pub features: FeatureVector,
}

impl FeaturizedRecord {
    pub fn solvent_label(&self, label: SolventLabel) -> &str {
        match label {
            SolventLabel::Smiles => &self.record.raw.solvent_smiles,
            SolventLabel::Name => &self.record.raw.solvent,
        }
    }

    /// The training row for this record, if every predictor is available.
    pub fn training_row(&self, label: SolventLabel) -> Option<TrainingRow> {
        let descriptors = self.features.descriptors()?;
        let temperature_k = self.record.raw.temperature_k?;
        let input = ModelInput::new(self.solvent_label(label), temperature_k, descriptors);
        input.is_complete().then(|| TrainingRow {
            input,
            target: self.record.raw.log_s,
        })
    }
}

/// Attaches descriptors to every record, computing them once per distinct SMILES.
pub fn featurize<P>(records: Vec<CleanRecord>, provider: &P) -> Vec<FeaturizedRecord>
where
    P: DescriptorProvider + ?Sized,
{
    let mut unique: Vec<&str> = records.iter().map(|r| r.raw.smiles.as_str()).collect();
    unique.sort_unstable();
    unique.dedup();

    #[cfg(not(feature = "parallel"))]
    let iterator = unique.iter();

    #[cfg(feature = "parallel")]
    let iterator = unique.par_iter();

    let computed: HashMap<String, FeatureVector> = iterator
        .map(|&smiles| (smiles.to_string(), provider.describe(smiles)))
        .collect();

    let invalid = computed.values().filter(|v| !v.is_valid()).count();
    info!(
        structures = computed.len(),
        invalid, "Computed molecular descriptors"
    );

    records
        .into_iter()
        .map(|record| {
            let features = computed
                .get(&record.raw.smiles)
                .copied()
                .unwrap_or(FeatureVector::Invalid);
            FeaturizedRecord { record, features }
        })
        .collect()
}

/// Builds the model-selection table, dropping rows with any missing predictor.
pub fn feature_table(records: &[FeaturizedRecord], label: SolventLabel) -> FeatureTable {
    let table = FeatureTable::from_rows(records.iter().filter_map(|r| r.training_row(label)));
    info!(
        usable = table.len(),
        excluded = records.len() - table.len(),
        "Assembled feature table"
    );
    table
}

#[derive(Serialize)]
struct FeaturizedRow<'a> {
    smiles: &'a str,
    temperature_k: Option<f64>,
    temperature_c: Option<f64>,
    solvent: &'a str,
    solvent_smiles: &'a str,
    solubility_mol_l: Option<f64>,
    solubility_mol_kg: Option<f64>,
    log_s: f64,
    compound_name: &'a str,
    cas: &'a str,
    pubchem_cid: &'a str,
    is_organic: &'a str,
    doi: &'a str,
    is_high_solubility: u8,
    solvent_category: &'static str,
    mol_weight: Option<f64>,
    logp: Option<f64>,
    tpsa: Option<f64>,
    h_donors: Option<u32>,
    h_acceptors: Option<u32>,
    rule_of_five: Option<u8>,
}

impl<'a> From<&'a FeaturizedRecord> for FeaturizedRow<'a> {
    fn from(featurized: &'a FeaturizedRecord) -> Self {
        let raw = &featurized.record.raw;
        let d = featurized.features.descriptors();
        Self {
            smiles: &raw.smiles,
            temperature_k: raw.temperature_k,
            temperature_c: featurized.record.temperature_c,
            solvent: &raw.solvent,
            solvent_smiles: &raw.solvent_smiles,
            solubility_mol_l: raw.solubility_mol_l,
            solubility_mol_kg: raw.solubility_mol_kg,
            log_s: raw.log_s,
            compound_name: &raw.compound_name,
            cas: &raw.cas,
            pubchem_cid: &raw.pubchem_cid,
            is_organic: &raw.is_organic,
            doi: &raw.doi,
            is_high_solubility: u8::from(featurized.record.is_high_solubility),
            solvent_category: featurized.record.solvent_category.as_str(),
            mol_weight: d.map(|d| d.mol_weight),
            logp: d.map(|d| d.logp),
            tpsa: d.map(|d| d.tpsa),
            h_donors: d.map(|d| d.h_donors),
            h_acceptors: d.map(|d| d.h_acceptors),
            rule_of_five: d.map(|d| d.rule_of_five),
        }
    }
}

/// Writes the cleaned, featurized table as CSV with a header row. Invalid
/// descriptors are written as empty fields.
pub fn write_featurized_csv(path: &Path, records: &[FeaturizedRecord]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DatasetError::Io {
            path: parent.to_string_lossy().to_string(),
            source: e,
        })?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(FeaturizedRow::from(record))?;
    }
    writer.flush().map_err(|e| DatasetError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    Ok(())
}
