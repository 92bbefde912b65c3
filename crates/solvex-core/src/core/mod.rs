//! # Core Module
//!
//! Stateless data models and algorithms that the engine and workflows build on.
//!
//! - **Chemistry** ([`chem`]) - SMILES parsing, the molecular graph and descriptor calculation
//! - **Data** ([`data`]) - Raw measurement loading, cleaning, statistics and featurization
//! - **Machine Learning** ([`ml`]) - Preprocessing, the regressor roster, metrics and pipelines
//! - **Persistence** ([`store`]) - Durable storage of the single best trained pipeline

pub mod chem;
pub mod data;
pub mod ml;
pub mod store;
