use thiserror::Error;

use super::config::ConfigError;
use crate::core::data::record::DatasetError;
use crate::core::ml::regressor::ModelError;
use crate::core::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Dataset error: {source}")]
    Dataset {
        #[from]
        source: DatasetError,
    },

    #[error("Model error: {source}")]
    Model {
        #[from]
        source: ModelError,
    },

    #[error("Model storage error: {source}")]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("The dataset has no usable rows after cleaning and featurization")]
    EmptyDataset,

    #[error("All {attempted} candidate models failed to train or evaluate")]
    AllCandidatesFailed { attempted: usize },

    #[error("None of the {attempted} solvent/temperature pairs produced a prediction")]
    NoViableCandidates { attempted: usize },
}
