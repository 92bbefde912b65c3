use crate::core::chem::solvents::DEFAULT_SOLVENTS;
use crate::core::data::clean::LogSWindow;
use crate::core::data::features::SolventLabel;
use crate::core::ml::preprocessing::UnknownCategory;
use crate::core::ml::regressor::ROSTER_IDS;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_T_MIN_K: f64 = 273.0;
pub const DEFAULT_T_MAX_K: f64 = 350.0;
pub const DEFAULT_T_STEP_K: f64 = 10.0;
pub const DEFAULT_TOP_K: usize = 5;
/// Upper bound on temperature grid points per search.
pub const MAX_TEMPERATURE_POINTS: usize = 10_000;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        parameter,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub input_path: PathBuf,
    pub log_s_window: LogSWindow,
    pub solvent_label: SolventLabel,
}

#[derive(Default)]
pub struct DatasetConfigBuilder {
    input_path: Option<PathBuf>,
    log_s_window: Option<LogSWindow>,
    solvent_label: Option<SolventLabel>,
}

impl DatasetConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }
    pub fn log_s_window(mut self, min: f64, max: f64) -> Self {
        self.log_s_window = Some(LogSWindow { min, max });
        self
    }
    pub fn solvent_label(mut self, label: SolventLabel) -> Self {
        self.solvent_label = Some(label);
        self
    }

    pub fn build(self) -> Result<DatasetConfig, ConfigError> {
        let log_s_window = self.log_s_window.unwrap_or_default();
        if !(log_s_window.min <= log_s_window.max) {
            return Err(invalid(
                "log_s_window",
                format!("min ({}) must not exceed max ({})", log_s_window.min, log_s_window.max),
            ));
        }
        Ok(DatasetConfig {
            input_path: self
                .input_path
                .ok_or(ConfigError::MissingParameter("input_path"))?,
            log_s_window,
            solvent_label: self.solvent_label.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrepareConfig {
    pub dataset: DatasetConfig,
    pub output_path: PathBuf,
    pub stats_path: Option<PathBuf>,
}

#[derive(Default)]
pub struct PrepareConfigBuilder {
    dataset: Option<DatasetConfig>,
    output_path: Option<PathBuf>,
    stats_path: Option<PathBuf>,
}

impl PrepareConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(mut self, dataset: DatasetConfig) -> Self {
        self.dataset = Some(dataset);
        self
    }
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }
    pub fn stats_path(mut self, path: Option<PathBuf>) -> Self {
        self.stats_path = path;
        self
    }

    pub fn build(self) -> Result<PrepareConfig, ConfigError> {
        Ok(PrepareConfig {
            dataset: self.dataset.ok_or(ConfigError::MissingParameter("dataset"))?,
            output_path: self
                .output_path
                .ok_or(ConfigError::MissingParameter("output_path"))?,
            stats_path: self.stats_path,
        })
    }
}

/// How candidates are split, encoded and which of them are tried.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub test_fraction: f64,
    pub seed: u64,
    /// Roster ids, evaluated in this order.
    pub models: Vec<String>,
    pub unknown_category: UnknownCategory,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
            models: ROSTER_IDS.iter().map(|id| id.to_string()).collect(),
            unknown_category: UnknownCategory::Ignore,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub dataset: DatasetConfig,
    pub selection: SelectionConfig,
    /// Where to also write the featurized table, if anywhere.
    pub features_out: Option<PathBuf>,
}

#[derive(Default)]
pub struct TrainingConfigBuilder {
    dataset: Option<DatasetConfig>,
    test_fraction: Option<f64>,
    seed: Option<u64>,
    models: Option<Vec<String>>,
    unknown_category: Option<UnknownCategory>,
    features_out: Option<PathBuf>,
}

impl TrainingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(mut self, dataset: DatasetConfig) -> Self {
        self.dataset = Some(dataset);
        self
    }
    pub fn test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = Some(fraction);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn models(mut self, models: Vec<String>) -> Self {
        self.models = Some(models);
        self
    }
    pub fn unknown_category(mut self, policy: UnknownCategory) -> Self {
        self.unknown_category = Some(policy);
        self
    }
    pub fn features_out(mut self, path: Option<PathBuf>) -> Self {
        self.features_out = path;
        self
    }

    pub fn build(self) -> Result<TrainingConfig, ConfigError> {
        let defaults = SelectionConfig::default();

        let test_fraction = self.test_fraction.unwrap_or(defaults.test_fraction);
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(invalid(
                "test_fraction",
                format!("{test_fraction} is not strictly between 0 and 1"),
            ));
        }

        let models = self.models.unwrap_or(defaults.models);
        if models.is_empty() {
            return Err(invalid("models", "at least one model must be selected"));
        }
        if let Some(unknown) = models.iter().find(|id| !ROSTER_IDS.contains(&id.as_str())) {
            return Err(invalid(
                "models",
                format!("unknown model '{unknown}' (known: {})", ROSTER_IDS.join(", ")),
            ));
        }

        Ok(TrainingConfig {
            dataset: self.dataset.ok_or(ConfigError::MissingParameter("dataset"))?,
            selection: SelectionConfig {
                test_fraction,
                seed: self.seed.unwrap_or(defaults.seed),
                models,
                unknown_category: self.unknown_category.unwrap_or(defaults.unknown_category),
            },
            features_out: self.features_out,
        })
    }
}

/// Inclusive temperature grid in Kelvin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureRange {
    pub min_k: f64,
    pub max_k: f64,
    pub step_k: f64,
}

impl Default for TemperatureRange {
    fn default() -> Self {
        Self {
            min_k: DEFAULT_T_MIN_K,
            max_k: DEFAULT_T_MAX_K,
            step_k: DEFAULT_T_STEP_K,
        }
    }
}

impl TemperatureRange {
    /// Number of grid points, or `None` for a range that is not finite, is inverted,
    /// or would exceed [`MAX_TEMPERATURE_POINTS`].
    pub fn point_count(&self) -> Option<usize> {
        let finite = self.min_k.is_finite() && self.max_k.is_finite() && self.step_k.is_finite();
        if !finite || !(self.step_k > 0.0) || self.min_k > self.max_k {
            return None;
        }
        let steps = ((self.max_k - self.min_k) / self.step_k + 1e-9).floor();
        if !(steps < MAX_TEMPERATURE_POINTS as f64) {
            return None;
        }
        (steps as usize).checked_add(1)
    }

    /// `min, min + step, …` up to and including `max` when it lies on the grid.
    /// Empty when [`point_count`](Self::point_count) is `None`.
    pub fn values(&self) -> Vec<f64> {
        let Some(count) = self.point_count() else {
            return Vec::new();
        };
        (0..count)
            .map(|i| self.min_k + i as f64 * self.step_k)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub smiles: String,
    /// Solvent SMILES, in grid order.
    pub solvents: Vec<String>,
    pub temperatures: TemperatureRange,
    pub top_k: usize,
}

#[derive(Default)]
pub struct SearchConfigBuilder {
    smiles: Option<String>,
    solvents: Option<Vec<String>>,
    temperatures: Option<TemperatureRange>,
    top_k: Option<usize>,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn smiles(mut self, smiles: impl Into<String>) -> Self {
        self.smiles = Some(smiles.into());
        self
    }
    pub fn solvents(mut self, solvents: Vec<String>) -> Self {
        self.solvents = Some(solvents);
        self
    }
    pub fn temperatures(mut self, min_k: f64, max_k: f64, step_k: f64) -> Self {
        self.temperatures = Some(TemperatureRange { min_k, max_k, step_k });
        self
    }
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    pub fn build(self) -> Result<SearchConfig, ConfigError> {
        let smiles = self.smiles.ok_or(ConfigError::MissingParameter("smiles"))?;

        let solvents = match self.solvents {
            Some(solvents) if !solvents.is_empty() => solvents,
            Some(_) => return Err(invalid("solvents", "the solvent list is empty")),
            None => DEFAULT_SOLVENTS.iter().map(|s| s.to_string()).collect(),
        };

        let temperatures = self.temperatures.unwrap_or_default();
        if ![temperatures.min_k, temperatures.max_k, temperatures.step_k]
            .iter()
            .all(|t| t.is_finite())
        {
            return Err(invalid(
                "temperature_range",
                format!(
                    "bounds and step must be finite, got [{}, {}] step {}",
                    temperatures.min_k, temperatures.max_k, temperatures.step_k
                ),
            ));
        }
        if !(temperatures.step_k > 0.0) {
            return Err(invalid("t_step", format!("step must be positive, got {}", temperatures.step_k)));
        }
        if !(temperatures.min_k > 0.0 && temperatures.min_k <= temperatures.max_k) {
            return Err(invalid(
                "temperature_range",
                format!(
                    "need 0 < min <= max, got [{}, {}]",
                    temperatures.min_k, temperatures.max_k
                ),
            ));
        }

        if temperatures.point_count().is_none() {
            return Err(invalid(
                "temperature_range",
                format!("the grid would exceed {} points", MAX_TEMPERATURE_POINTS),
            ));
        }

        let top_k = self.top_k.unwrap_or(DEFAULT_TOP_K);
        if top_k == 0 {
            return Err(invalid("top_k", "must be at least 1"));
        }

        Ok(SearchConfig {
            smiles,
            solvents,
            temperatures,
            top_k,
        })
    }
}
