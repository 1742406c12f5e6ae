//! Startup error type.
//!
//! Only pipeline startup can fail synchronously: configuration validation and
//! opening the two files. Everything that goes wrong after the worker threads
//! exist is handled locally (retry, backoff, skip) and reported through logs
//! and counters, never through `Err` — see the taxonomy in the crate docs.

use std::io;
use std::path::PathBuf;

/// Error returned by [`LogPipeline::start`](crate::pipeline::LogPipeline::start).
///
/// Each variant carries enough context to print a one-line diagnosis without
/// the caller having to re-derive which path or config field was at fault.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// A configuration field failed validation; no files were touched.
    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfig {
        /// Name of the offending config field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// The input file could not be opened for reading.
    #[error("cannot open input file '{}': {source}", path.display())]
    OpenInput {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The output file could not be opened for appending.
    #[error("cannot open output file '{}': {source}", path.display())]
    OpenOutput {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A worker thread could not be spawned.
    #[error("cannot spawn {name} thread: {source}")]
    Spawn {
        /// Thread name that failed to start.
        name: &'static str,
        /// Underlying OS error.
        source: io::Error,
    },
}
