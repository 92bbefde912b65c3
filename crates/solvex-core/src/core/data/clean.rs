use super::record::RawRecord;
use crate::core::chem::solvents::SolventCategory;
use std::collections::HashSet;
use tracing::info;

/// Solubility values below this are treated as measurement noise.
pub const DEFAULT_LOG_S_MIN: f64 = -12.0;
pub const DEFAULT_LOG_S_MAX: f64 = 2.0;
/// Records above this logS are flagged as highly soluble.
pub const HIGH_SOLUBILITY_THRESHOLD: f64 = -4.0;

const KELVIN_OFFSET: f64 = 273.15;

/// Inclusive logS window applied while cleaning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogSWindow {
    pub min: f64,
    pub max: f64,
}

impl Default for LogSWindow {
    fn default() -> Self {
        Self {
            min: DEFAULT_LOG_S_MIN,
            max: DEFAULT_LOG_S_MAX,
        }
    }
}

impl LogSWindow {
    pub fn contains(&self, log_s: f64) -> bool {
        log_s >= self.min && log_s <= self.max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    pub raw: RawRecord,
    pub temperature_c: Option<f64>,
    pub is_high_solubility: bool,
    pub solvent_category: SolventCategory,
}

impl CleanRecord {
    fn derive(raw: RawRecord) -> Self {
        let category_source = if raw.solvent_smiles.is_empty() {
            raw.solvent.as_str()
        } else {
            raw.solvent_smiles.as_str()
        };
        Self {
            temperature_c: raw.temperature_k.map(|k| k - KELVIN_OFFSET),
            is_high_solubility: raw.log_s > HIGH_SOLUBILITY_THRESHOLD,
            solvent_category: SolventCategory::classify(category_source),
            raw,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub out_of_range_removed: usize,
    pub output_rows: usize,
}

/// Removes exact duplicates and out-of-window targets, then derives the per-record
/// convenience columns. The first occurrence of a duplicated row is kept.
pub fn clean(records: Vec<RawRecord>, window: LogSWindow) -> (Vec<CleanRecord>, CleaningReport) {
    let input_rows = records.len();

    let mut seen = HashSet::with_capacity(records.len());
    let mut keep = Vec::with_capacity(records.len());
    for record in &records {
        keep.push(seen.insert(record.key()));
    }
    drop(seen);

    let unique: Vec<RawRecord> = records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect();
    let duplicates_removed = input_rows - unique.len();

    let after_dedup = unique.len();
    let cleaned: Vec<CleanRecord> = unique
        .into_iter()
        .filter(|record| window.contains(record.log_s))
        .map(CleanRecord::derive)
        .collect();

    let report = CleaningReport {
        input_rows,
        duplicates_removed,
        out_of_range_removed: after_dedup - cleaned.len(),
        output_rows: cleaned.len(),
    };
    info!(
        input = report.input_rows,
        duplicates = report.duplicates_removed,
        out_of_range = report.out_of_range_removed,
        kept = report.output_rows,
        "Cleaned solubility records"
    );
    (cleaned, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::record::read_records;

    fn records(csv: &str) -> Vec<RawRecord> {
        read_records(csv.as_bytes()).unwrap()
    }

    #[test]
    fn clean_drops_duplicates_and_out_of_window_rows() {
        let raw = records(
            "CCO,298.15,water,O,,,-1.0\n\
             CCO,298.15,water,O,,,-1.0\n\
             CCC,298.15,water,O,,,-12.0\n\
             CCCC,298.15,water,O,,,2.0\n\
             CCCCC,298.15,water,O,,,-12.5\n\
             CCCCCC,298.15,water,O,,,2.1\n",
        );
        let (cleaned, report) = clean(raw, LogSWindow::default());

        assert_eq!(report.input_rows, 6);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.out_of_range_removed, 2);
        assert_eq!(report.output_rows, 3);
        let smiles: Vec<&str> = cleaned.iter().map(|r| r.raw.smiles.as_str()).collect();
        assert_eq!(smiles, ["CCO", "CCC", "CCCC"]);
    }

    #[test]
    fn clean_derives_convenience_columns() {
        let raw = records(
            "CCO,300,water,O,,,-3.5\n\
             CCO,,ethanol,CCO,,,-4.0\n\
             CCO,310,dmso,CS(C)=O,,,-6\n",
        );
        let (cleaned, _) = clean(raw, LogSWindow::default());

        assert!((cleaned[0].temperature_c.unwrap() - 26.85).abs() < 1e-9);
        assert!(cleaned[0].is_high_solubility);
        assert_eq!(cleaned[0].solvent_category, SolventCategory::Water);

        assert_eq!(cleaned[1].temperature_c, None);
        assert!(!cleaned[1].is_high_solubility);
        assert_eq!(cleaned[1].solvent_category, SolventCategory::Alcohol);

        assert_eq!(cleaned[2].solvent_category, SolventCategory::Other);
    }

    #[test]
    fn custom_window_is_inclusive() {
        let window = LogSWindow { min: -2.0, max: 0.0 };
        assert!(window.contains(-2.0));
        assert!(window.contains(0.0));
        assert!(!window.contains(0.01));
    }
}
