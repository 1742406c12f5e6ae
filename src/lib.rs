//! Tail-filter-append log shipping core.
//!
//! ## Scope
//! This crate tails a growing log file, frames the byte stream into lines,
//! keeps the lines that contain any configured keyword, and appends them to
//! an output file, optionally stamped with a wall-clock timestamp. It is the
//! core of a lightweight log monitor, not a general log router.
//!
//! ## Key invariants
//! - Only bytes appended after startup are processed; the reader seeks to
//!   end-of-file before its first read.
//! - Every emitted line is at most `max_line_len` bytes; longer logical lines
//!   are emitted once, truncated, with the remainder discarded.
//! - The queue is bounded; a fast producer blocks (backpressure) instead of
//!   dropping lines or growing without limit.
//! - Line buffers come from a grow-only pool; the steady-state hot path does
//!   not allocate.
//! - Shutdown drains: every line enqueued before the queue closes is still
//!   matched and, if kept, written and flushed.
//!
//! ## Pipeline flow
//! `input file -> reader (tail + frame) -> bounded queue -> sink (match + stamp + append)`
//!
//! Two OS threads. The reader owns the input handle, framer, and chunk
//! buffer; the sink owns the matcher and output writer. They share only the
//! queue, the pool, and the shutdown token.
//!
//! ## Notable entry points
//! - [`LogPipeline`] / [`Config`]: start, observe, and stop a pipeline.
//! - [`KeywordMatcher`]: standalone any-of substring matching.
//! - [`ShutdownToken`]: cooperative stop flag, e.g. for signal handlers.
//!
//! ## Error taxonomy
//! Startup failures are synchronous ([`StartError`]). After the threads
//! exist, I/O trouble is fail-soft: read errors back off and retry, write
//! errors drop the one line and count it, and both are logged. The final
//! [`PipelineReport`] carries the counters.

pub mod affinity;
pub mod config;
pub mod error;
pub mod framer;
pub mod matcher;
pub mod pipeline;
pub mod pool;
pub mod queue;

mod reader;
mod sink;

pub use config::Config;
pub use error::StartError;
pub use matcher::{KeywordMatcher, AUTOMATON_THRESHOLD};
pub use pipeline::{LogPipeline, PipelineReport, ShutdownToken, State};
pub use pool::{BufferPool, PoolStats};
pub use queue::LineQueue;
