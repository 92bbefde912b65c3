use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// One measurement row of the raw solubility table.
///
/// Numeric columns are parsed leniently: anything that does not read as a number is
/// stored as `None`. `log_s` is mandatory and rows without it never become records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    pub smiles: String,
    pub temperature_k: Option<f64>,
    pub solvent: String,
    pub solvent_smiles: String,
    pub solubility_mol_l: Option<f64>,
    pub solubility_mol_kg: Option<f64>,
    pub log_s: f64,
    pub compound_name: String,
    pub cas: String,
    pub pubchem_cid: String,
    pub is_organic: String,
    pub doi: String,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset file not found: '{path}'")]
    NotFound { path: String },
    #[error("Dataset file '{path}' is empty")]
    Empty { path: String },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

const COLUMN_COUNT: usize = 12;

/// Hashable identity of a record, used to drop exact duplicate rows.
#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct RecordKey<'a> {
    text: [&'a str; 8],
    numbers: [Option<u64>; 4],
}

impl RawRecord {
    pub(crate) fn key(&self) -> RecordKey<'_> {
        let bits = |value: Option<f64>| value.map(f64::to_bits);
        RecordKey {
            text: [
                &self.smiles,
                &self.solvent,
                &self.solvent_smiles,
                &self.compound_name,
                &self.cas,
                &self.pubchem_cid,
                &self.is_organic,
                &self.doi,
            ],
            numbers: [
                bits(self.temperature_k),
                bits(self.solubility_mol_l),
                bits(self.solubility_mol_kg),
                bits(Some(self.log_s)),
            ],
        }
    }

    fn from_fields(record: &csv::StringRecord) -> Option<Self> {
        let text = |index: usize| record.get(index).map(str::trim).unwrap_or("").to_string();
        let number = |index: usize| {
            record
                .get(index)
                .and_then(|field| field.trim().parse::<f64>().ok())
                .filter(|value| !value.is_nan())
        };

        let smiles = text(0);
        if smiles.is_empty() {
            return None;
        }
        let log_s = number(6)?;

        Some(Self {
            smiles,
            temperature_k: number(1),
            solvent: text(2),
            solvent_smiles: text(3),
            solubility_mol_l: number(4),
            solubility_mol_kg: number(5),
            log_s,
            compound_name: text(7),
            cas: text(8),
            pubchem_cid: text(9),
            is_organic: text(10),
            doi: text(11),
        })
    }
}

/// Loads raw records from a headerless CSV file.
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>, DatasetError> {
    let display = path.to_string_lossy().to_string();
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DatasetError::NotFound {
            path: display.clone(),
        },
        _ => DatasetError::Io {
            path: display.clone(),
            source: e,
        },
    })?;
    if metadata.len() == 0 {
        return Err(DatasetError::Empty { path: display });
    }

    let file = File::open(path).map_err(|e| DatasetError::Io {
        path: display,
        source: e,
    })?;
    read_records(file)
}

/// Reads raw records from any headerless CSV source.
///
/// Columns are taken by position; extra columns are ignored and short rows are padded
/// with missing values. A header line, if present, fails the `log_s` check and is
/// dropped like any other unusable row.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for row in csv_reader.records() {
        let row = row?;
        match RawRecord::from_fields(&row) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    debug!(
        loaded = records.len(),
        dropped,
        columns = COLUMN_COUNT,
        "Read raw solubility records"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
smiles,temperature_k,solvent,solvent_smiles,solubility_mol_l,solubility_mol_kg,log_s,compound_name,cas,pubchem_cid,is_organic,doi
CCO,298.15,water,O,1.0,,0.0,ethanol,64-17-5,702,True,10.1/x
c1ccccc1,298.15,ethanol,CCO,n/a,,-1.5,benzene
,298.15,water,O,1.0,,0.0,missing smiles
CCC,abc,water,O,1.0,,-2.0,propane,,,,,extra,columns
CC,298.15,water,O,1.0,,not-a-number,ethane
";

    #[test]
    fn read_records_coerces_fields_and_drops_unusable_rows() {
        let records = read_records(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].smiles, "CCO");
        assert_eq!(records[0].temperature_k, Some(298.15));
        assert_eq!(records[0].solvent_smiles, "O");
        assert_eq!(records[0].doi, "10.1/x");

        assert_eq!(records[1].solubility_mol_l, None);
        assert_eq!(records[1].compound_name, "benzene");
        assert_eq!(records[1].doi, "");

        assert_eq!(records[2].temperature_k, None);
        assert_eq!(records[2].log_s, -2.0);
    }

    #[test]
    fn load_records_reports_missing_file() {
        let dir = tempdir().unwrap();
        let result = load_records(&dir.path().join("missing.csv"));
        assert!(matches!(result, Err(DatasetError::NotFound { .. })));
    }

    #[test]
    fn load_records_reports_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(matches!(
            load_records(&path),
            Err(DatasetError::Empty { .. })
        ));
    }

    #[test]
    fn identical_rows_share_a_key() {
        let csv = "CCO,298,water,O,,,-1\nCCO,298,water,O,,,-1\nCCO,299,water,O,,,-1\n";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0].key(), records[1].key());
        assert_ne!(records[0].key(), records[2].key());
    }
}
