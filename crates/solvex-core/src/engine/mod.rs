//! # Engine Module
//!
//! The two decision procedures of the library, built on the stateless [`crate::core`]
//! layer.
//!
//! - **Model selection** ([`selection`]) - Trains a roster of regressors on one seeded
//!   train/test split with shared preprocessing and keeps the lowest-MAE pipeline
//! - **Condition search** ([`search`]) - Scores every solvent/temperature pair for a fixed
//!   query structure and ranks the results
//! - **Configuration** ([`config`]) - Validated settings and their builders
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events for front ends
//! - **Error Handling** ([`error`]) - The engine error type wrapping every lower layer
//!
//! Both procedures are single-pass and keep no state between runs; the persisted
//! pipeline is the only artifact shared between them.

pub mod config;
pub mod error;
pub mod progress;
pub mod search;
pub mod selection;
