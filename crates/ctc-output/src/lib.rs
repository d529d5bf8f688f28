//! `ctc-output` — benchmark metrics for the ctc coordinator.
//!
//! A [`BenchmarkRecorder`] hangs off the engine observer hooks, computes one
//! [`StepMetrics`] row per tick from the world's aggregates, and on
//! completion writes two files into the statistics directory:
//!
//! | File                              | Contents                          |
//! |-----------------------------------|-----------------------------------|
//! | `benchmark_<name>_<stamp>.csv`    | One row per recorded step         |
//! | `summary_<name>_<stamp>.json`     | Whole-run [`RunSummary`]          |
//!
//! The recorder never holds references into the live world: every hook copies
//! primitive aggregates and returns.

pub mod error;
pub mod metrics;
pub mod recorder;
pub mod report;

#[cfg(test)]
mod tests;

pub use error::{OutputError, OutputResult};
pub use metrics::{RunSummary, StepMetrics};
pub use recorder::BenchmarkRecorder;
