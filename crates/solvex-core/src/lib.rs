//! # Solvex Core Library
//!
//! Predicts the solubility (logS) of small molecules across solvents and temperatures
//! from molecular structure, and recommends the conditions that maximize it.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless building blocks: the SMILES parser and molecular
//!   graph, the descriptor provider, dataset loading and cleaning, the regression estimators
//!   with their shared preprocessing, and model persistence.
//!
//! - **[`engine`]: The Logic Core.** The model selector, which trains a fixed roster of
//!   regressors on an identical split and keeps the best one, and the condition optimizer,
//!   which grid-searches solvent/temperature pairs against a trained pipeline.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures (`prepare`, `train`, `optimize`)
//!   that tie the `core` and `engine` layers together behind a small surface.

pub mod core;
pub mod engine;
pub mod workflows;
