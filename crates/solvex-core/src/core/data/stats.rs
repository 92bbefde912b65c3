use super::clean::CleanRecord;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Summary statistics over a cleaned dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub records: usize,
    /// Distinct non-empty compound names.
    pub compounds: usize,
    /// Distinct non-empty solvent names.
    pub solvents: usize,
    pub log_s_mean: f64,
    pub log_s_median: f64,
    /// Sample standard deviation (n - 1 denominator); NaN below two records.
    pub log_s_std: f64,
}

impl DatasetStats {
    pub fn compute(records: &[CleanRecord]) -> Self {
        let distinct = |field: fn(&CleanRecord) -> &str| {
            records
                .iter()
                .map(field)
                .filter(|value| !value.is_empty())
                .collect::<HashSet<_>>()
                .len()
        };

        let mut values: Vec<f64> = records.iter().map(|r| r.raw.log_s).collect();
        let n = values.len();
        let mean = if n == 0 {
            f64::NAN
        } else {
            values.iter().sum::<f64>() / n as f64
        };
        let std = if n < 2 {
            f64::NAN
        } else {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        };

        values.sort_by(f64::total_cmp);
        let median = match n {
            0 => f64::NAN,
            _ if n % 2 == 1 => values[n / 2],
            _ => (values[n / 2 - 1] + values[n / 2]) / 2.0,
        };

        Self {
            records: n,
            compounds: distinct(|r| r.raw.compound_name.as_str()),
            solvents: distinct(|r| r.raw.solvent.as_str()),
            log_s_mean: mean,
            log_s_median: median,
            log_s_std: std,
        }
    }

    /// Writes the human-readable report produced by [`fmt::Display`].
    pub fn write_report(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_string())
    }
}

impl fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Records: {}", self.records)?;
        writeln!(f, "Compounds: {}", self.compounds)?;
        writeln!(f, "Solvents: {}", self.solvents)?;
        writeln!(f, "Mean logS: {:.2}", self.log_s_mean)?;
        writeln!(f, "Median logS: {:.2}", self.log_s_median)?;
        writeln!(f, "Std logS: {:.2}", self.log_s_std)
    }
}
