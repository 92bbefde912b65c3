use solvex::core::chem::solvents::DEFAULT_SOLVENTS;
use solvex::core::data::clean::{DEFAULT_LOG_S_MAX, DEFAULT_LOG_S_MIN};
use solvex::core::data::features::SolventLabel;
use solvex::core::ml::preprocessing::UnknownCategory;
use solvex::core::ml::regressor::ROSTER_IDS;
use solvex::engine::config::{
    DEFAULT_SEED, DEFAULT_T_MAX_K, DEFAULT_T_MIN_K, DEFAULT_T_STEP_K, DEFAULT_TEST_FRACTION,
    DEFAULT_TOP_K,
};

/// Values used when neither a flag, a `-S` override nor the config file sets a key.
#[derive(Debug, Clone)]
pub struct DefaultsConfig {
    pub log_s_min: f64,
    pub log_s_max: f64,
    pub solvent_label: SolventLabel,
    pub test_fraction: f64,
    pub seed: u64,
    pub models: Vec<String>,
    pub unknown_category: UnknownCategory,
    pub t_min: f64,
    pub t_max: f64,
    pub t_step: f64,
    pub solvents: Vec<String>,
    pub top_k: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            log_s_min: DEFAULT_LOG_S_MIN,
            log_s_max: DEFAULT_LOG_S_MAX,
            solvent_label: SolventLabel::Smiles,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
            models: ROSTER_IDS.iter().map(|id| id.to_string()).collect(),
            unknown_category: UnknownCategory::Ignore,
            t_min: DEFAULT_T_MIN_K,
            t_max: DEFAULT_T_MAX_K,
            t_step: DEFAULT_T_STEP_K,
            solvents: DEFAULT_SOLVENTS.iter().map(|s| s.to_string()).collect(),
            top_k: DEFAULT_TOP_K,
        }
    }
}
