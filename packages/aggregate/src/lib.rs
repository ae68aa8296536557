#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial aggregation engine.
//!
//! Turns point-feature datasets into per-block features in two phases:
//!
//! 1. [`preprocess`] attaches every point to its containing block and
//!    reduces each block's points to one summary row.
//! 2. [`aggregator`] counts, for each block, the summary rows in the same
//!    borough whose location lies within the walking catchment of the
//!    block centroid. [`orchestrator`] runs this over contiguous
//!    [`partition`]s of the block list on a fixed-size worker pool.

pub mod aggregator;
pub mod orchestrator;
pub mod partition;
pub mod preprocess;
pub mod progress;

use thiserror::Error;

pub use aggregator::{AggregationRow, CATCHMENT_RADIUS_M, aggregate_block};
pub use orchestrator::{AggregationTable, DEFAULT_WORKERS, run_all, run_sequential};
pub use partition::partition;
pub use preprocess::{SourceSummary, SummaryRow, aggregate_exact};

/// Errors that can occur while running the aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Worker count must be at least one.
    #[error("Worker count must be at least 1")]
    InvalidWorkerCount,

    /// The worker pool could not be started.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A worker panicked while aggregating its partition.
    #[error("Worker for partition {partition} failed: {message}")]
    WorkerPanicked {
        /// Index of the failed partition.
        partition: usize,
        /// Panic message.
        message: String,
    },
}
