//! Tailing reader thread body.
//!
//! # Design
//!
//! The reader owns the input file handle and a scratch chunk buffer. It loops
//! until the shutdown token is set: read a chunk, feed it to the framer, and
//! sleep for the poll interval whenever the file has no new bytes. The caller
//! (pipeline controller) has already positioned the handle at end-of-file, so
//! only data appended after startup is observed.
//!
//! # Error Policy
//!
//! Read errors after startup are fail-soft: `Interrupted` retries
//! immediately, anything else is logged at `warn` and retried after one poll
//! interval. A tailed file going briefly unreadable (rotation, NFS hiccup)
//! must not kill the pipeline.
//!
//! # Shutdown
//!
//! Two exits: the shutdown token (checked once per loop iteration, so stop
//! latency is bounded by one poll sleep plus one read), or the queue closing
//! underneath a blocked `push`, which surfaces here as `ControlFlow::Break`
//! from the framer. Either way the framer is drained back into the pool and
//! the counters are returned.

use std::fs::File;
use std::io::Read;
use std::thread;
use std::time::Duration;

use crate::framer::LineFramer;
use crate::pipeline::ShutdownToken;
use crate::pool::BufferPool;
use crate::queue::LineQueue;

/// Counters returned when the reader thread exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReaderReport {
    /// Raw bytes consumed from the input file.
    pub bytes_read: u64,
    /// Lines submitted to the queue (including truncated ones).
    pub lines_completed: u64,
    /// Lines cut at the maximum length.
    pub lines_truncated: u64,
}

/// Runs the tail-read loop to completion. Thread body for the reader.
pub fn run_reader(
    mut file: File,
    chunk_size: usize,
    max_line_len: usize,
    poll_interval: Duration,
    shutdown: ShutdownToken,
    pool: &BufferPool,
    queue: &LineQueue,
) -> ReaderReport {
    debug_assert!(chunk_size > 0);

    let mut chunk = vec![0u8; chunk_size];
    let mut framer = LineFramer::new(max_line_len, pool);
    let mut bytes_read: u64 = 0;

    while !shutdown.is_stop_requested() {
        match file.read(&mut chunk) {
            Ok(0) => {
                // At end-of-file. Wait for the producer to append more.
                thread::sleep(poll_interval);
            }
            Ok(n) => {
                bytes_read += n as u64;
                if framer.feed(&chunk[..n], pool, queue).is_break() {
                    tracing::debug!("line queue closed; reader exiting");
                    break;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => {
                tracing::warn!(error = %err, "read from input file failed; retrying");
                thread::sleep(poll_interval);
            }
        }
    }

    let stats = framer.finish(pool);
    tracing::debug!(
        bytes_read,
        lines = stats.completed,
        truncated = stats.truncated,
        "reader finished"
    );
    ReaderReport {
        bytes_read,
        lines_completed: stats.completed,
        lines_truncated: stats.truncated,
    }
}
