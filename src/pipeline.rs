//! Pipeline controller: startup, thread ownership, and orderly shutdown.
//!
//! # Design
//!
//! [`LogPipeline::start`] validates the configuration, opens both files, and
//! spawns the two worker threads (sink first so the queue always has its
//! consumer before the producer exists). The returned handle owns everything;
//! [`LogPipeline::stop`] tears it down and yields the final counters.
//!
//! # Shutdown Order
//!
//! `stop` is deadlock-free by construction:
//!
//! 1. Set the shutdown token. The reader observes it within one poll
//!    interval plus one read.
//! 2. Join the reader. The sink is still consuming, so a reader blocked on
//!    a full queue drains and exits.
//! 3. Close the queue. No producer exists anymore, so every line enqueued
//!    so far is still delivered.
//! 4. Join the sink. It drains the remainder, hits the terminal `None`,
//!    flushes, and exits.
//!
//! Closing the queue before joining the reader would be wrong in the other
//! direction: the reader would see rejected pushes and drop lines that were
//! already read from the input file.
//!
//! # States
//!
//! ```text
//! Idle -> Opening -> Running -> Stopping -> Stopped
//! ```
//!
//! `Idle` and `Opening` are transient inside `start`; a constructed handle
//! is observable as `Running`, `Stopping`, or `Stopped`. `stop` is
//! idempotent and returns the cached report on repeat calls.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::affinity;
use crate::config::Config;
use crate::error::StartError;
use crate::matcher::KeywordMatcher;
use crate::pool::{BufferPool, PoolStats};
use crate::queue::LineQueue;
use crate::reader::{run_reader, ReaderReport};
use crate::sink::{run_sink, SinkReport};

/// Shared stop flag handed to the worker threads.
///
/// Cloning is cheap (one `Arc`). Once requested, stop cannot be revoked.
#[derive(Clone, Debug)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Creates a token with no stop requested.
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests a stop. Safe to call from any thread, including a signal
    /// handler context that merely sets a flag and defers to the main loop.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// True once a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Observable lifecycle state of a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// No resources held.
    Idle,
    /// Validating config and opening files.
    Opening,
    /// Both worker threads live.
    Running,
    /// `stop` in progress.
    Stopping,
    /// Threads joined, report available.
    Stopped,
}

impl State {
    /// Lowercase name for logs.
    pub fn name(self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Opening => "opening",
            State::Running => "running",
            State::Stopping => "stopping",
            State::Stopped => "stopped",
        }
    }
}

/// Final counters, assembled when both threads have joined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Raw bytes consumed from the input file.
    pub bytes_read: u64,
    /// Lines the framer completed (including truncated ones).
    pub lines_completed: u64,
    /// Lines cut at the maximum length.
    pub lines_truncated: u64,
    /// Lines the sink consumed from the queue.
    pub lines_processed: u64,
    /// Lines the matcher kept.
    pub lines_matched: u64,
    /// Matched lines successfully written.
    pub lines_written: u64,
    /// Matched lines dropped due to write failures.
    pub write_errors: u64,
    /// Buffer pool accounting at shutdown.
    pub pool: PoolStats,
}

/// A running tail-filter-append pipeline.
///
/// Dropping a running pipeline stops it; prefer calling [`stop`] explicitly
/// to obtain the report.
///
/// [`stop`]: LogPipeline::stop
#[derive(Debug)]
pub struct LogPipeline {
    state: State,
    shutdown: ShutdownToken,
    queue: Arc<LineQueue>,
    pool: Arc<BufferPool>,
    reader: Option<JoinHandle<ReaderReport>>,
    sink: Option<JoinHandle<SinkReport>>,
    report: Option<PipelineReport>,
}

impl LogPipeline {
    /// Validates `config`, opens both files, and spawns the worker threads.
    ///
    /// The input file is positioned at its current end before the reader
    /// starts, so pre-existing content is never processed. The output file
    /// is opened in append mode and created if absent.
    pub fn start(config: Config) -> Result<Self, StartError> {
        config.validate()?;

        let mut input = File::open(&config.input_path).map_err(|source| StartError::OpenInput {
            path: config.input_path.clone(),
            source,
        })?;
        input
            .seek(SeekFrom::End(0))
            .map_err(|source| StartError::OpenInput {
                path: config.input_path.clone(),
                source,
            })?;

        let output = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&config.output_path)
            .map_err(|source| StartError::OpenOutput {
                path: config.output_path.clone(),
                source,
            })?;

        let matcher = KeywordMatcher::new(&config.keywords);
        tracing::info!(
            input = %config.input_path.display(),
            output = %config.output_path.display(),
            keywords = config.keywords.len(),
            strategy = matcher.strategy(),
            stamp = config.stamp_lines,
            "starting pipeline"
        );

        // Pool buffers must hold a full truncated line.
        let pool = Arc::new(BufferPool::new(
            config.max_line_len,
            config.initial_pool_size,
        ));
        let queue = Arc::new(LineQueue::new(config.queue_capacity));
        let shutdown = ShutdownToken::new();

        let sink = {
            let queue = Arc::clone(&queue);
            let pool = Arc::clone(&pool);
            let core = config.sink_core;
            let stamp = config.stamp_lines;
            std::thread::Builder::new()
                .name("line-sink".into())
                .spawn(move || {
                    pin_if_requested(core);
                    run_sink(&queue, &pool, &matcher, BufWriter::new(output), stamp)
                })
                .map_err(|source| StartError::Spawn {
                    name: "line-sink",
                    source,
                })?
        };

        let reader = {
            let queue = Arc::clone(&queue);
            let pool = Arc::clone(&pool);
            let shutdown = shutdown.clone();
            let core = config.reader_core;
            let chunk_size = config.chunk_size;
            let max_line_len = config.max_line_len;
            let poll_interval = config.poll_interval;
            std::thread::Builder::new()
                .name("tail-reader".into())
                .spawn(move || {
                    pin_if_requested(core);
                    run_reader(
                        input,
                        chunk_size,
                        max_line_len,
                        poll_interval,
                        shutdown,
                        &pool,
                        &queue,
                    )
                })
        };
        let reader = match reader {
            Ok(handle) => handle,
            Err(source) => {
                // Unwind the half-started pipeline before reporting.
                queue.close();
                let _ = sink.join();
                return Err(StartError::Spawn {
                    name: "tail-reader",
                    source,
                });
            }
        };

        Ok(Self {
            state: State::Running,
            shutdown,
            queue,
            pool,
            reader: Some(reader),
            sink: Some(sink),
            report: None,
        })
    }

    /// Stops the pipeline and returns the final report. Idempotent.
    ///
    /// Blocks until both threads have joined; worst-case latency is one poll
    /// interval plus the time to drain the queue.
    pub fn stop(&mut self) -> PipelineReport {
        if let Some(report) = self.report {
            return report;
        }

        self.state = State::Stopping;
        self.shutdown.request_stop();

        let reader = self
            .reader
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        // Only now is it safe to reject pushes: the producer is gone.
        self.queue.close();

        let sink = self
            .sink
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        let report = PipelineReport {
            bytes_read: reader.bytes_read,
            lines_completed: reader.lines_completed,
            lines_truncated: reader.lines_truncated,
            lines_processed: sink.processed,
            lines_matched: sink.matched,
            lines_written: sink.written,
            write_errors: sink.write_errors,
            pool: self.pool.stats(),
        };

        self.state = State::Stopped;
        self.report = Some(report);
        tracing::info!(
            lines = report.lines_completed,
            matched = report.lines_matched,
            written = report.lines_written,
            truncated = report.lines_truncated,
            "pipeline stopped"
        );
        report
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    /// A clone of the stop flag, e.g. for wiring into a signal handler.
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Lines currently waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for LogPipeline {
    fn drop(&mut self) {
        if self.report.is_none() {
            let _ = self.stop();
        }
    }
}

/// Applies a best-effort core pin on the calling worker thread.
fn pin_if_requested(core: Option<usize>) {
    if let Some(core) = core {
        if let Err(err) = affinity::pin_current_thread_to_core(core) {
            tracing::warn!(core, error = %err, "failed to pin thread; continuing unpinned");
        }
    }
}
