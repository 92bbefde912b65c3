//! # Workflows Module
//!
//! End-to-end entry points that tie the [`crate::core`] building blocks and the
//! [`crate::engine`] procedures together.
//!
//! - **Prepare** ([`prepare`]) - Load, clean and featurize a raw measurement table
//! - **Train** ([`train`]) - Prepare the dataset, select the best regressor and persist it
//! - **Optimize** ([`optimize`]) - Search solvents and temperatures for one structure with
//!   the persisted pipeline
//!
//! Every workflow accepts a [`ProgressReporter`](crate::engine::progress::ProgressReporter)
//! and emits `tracing` spans, so front ends can render progress and logs independently.

pub mod optimize;
pub mod prepare;
pub mod train;
