//! Filtering output sink thread body.
//!
//! # Design
//!
//! The sink is the queue's only consumer. It pops until the terminal `None`,
//! runs each line through the keyword matcher, and appends matching lines to
//! the output file through a `BufWriter`. Every popped buffer is returned to
//! the pool no matter how the line fared.
//!
//! Matching lines are assembled into a reusable record buffer so the newline
//! (and the optional timestamp suffix) go out in a single `write_all`. Lines
//! written by one sink are therefore never interleaved mid-record.
//!
//! # Timestamping
//!
//! With stamping enabled the sink appends `\t#MON_TS=<nanos>` before the
//! newline, where `<nanos>` is wall-clock nanoseconds since the Unix epoch
//! taken at write time. Successive stamps are non-decreasing except across
//! wall-clock adjustments.
//!
//! # Error Policy
//!
//! Write errors are fail-soft: log at `warn`, count, drop the line, keep
//! consuming. The sink draining the queue is what keeps a blocked reader
//! from deadlocking on shutdown, so it must not exit early.
//!
//! # Flushing
//!
//! The writer is flushed whenever the queue goes idle and once after the
//! terminal `None`, so shutdown never strands buffered bytes.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::matcher::KeywordMatcher;
use crate::pool::BufferPool;
use crate::queue::LineQueue;

/// Counters returned when the sink thread exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Lines consumed from the queue.
    pub processed: u64,
    /// Lines the matcher kept.
    pub matched: u64,
    /// Matched lines successfully written.
    pub written: u64,
    /// Matched lines dropped due to write failures.
    pub write_errors: u64,
}

/// Runs the consume-match-write loop to completion. Thread body for the sink.
pub fn run_sink<W: Write>(
    queue: &LineQueue,
    pool: &BufferPool,
    matcher: &KeywordMatcher,
    mut out: W,
    stamp_lines: bool,
) -> SinkReport {
    let mut report = SinkReport::default();
    // One record buffer reused across lines; sized for line + stamp + newline.
    let mut record: Vec<u8> = Vec::with_capacity(pool.buf_capacity() + 64);

    while let Some(line) = queue.pop() {
        report.processed += 1;

        if matcher.matches(&line) {
            report.matched += 1;

            record.clear();
            record.extend_from_slice(&line);
            if stamp_lines {
                // Pre-epoch clocks degrade to a zero stamp rather than a panic.
                let nanos = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos();
                // Writing into a Vec cannot fail.
                let _ = write!(record, "\t#MON_TS={nanos}");
            }
            record.push(b'\n');

            match out.write_all(&record) {
                Ok(()) => report.written += 1,
                Err(err) => {
                    report.write_errors += 1;
                    tracing::warn!(error = %err, "write to output file failed; line dropped");
                }
            }
        }

        pool.release(line);

        if queue.is_empty() {
            if let Err(err) = out.flush() {
                tracing::warn!(error = %err, "flush of output file failed");
            }
        }
    }

    if let Err(err) = out.flush() {
        tracing::warn!(error = %err, "final flush of output file failed");
    }

    tracing::debug!(
        processed = report.processed,
        matched = report.matched,
        written = report.written,
        write_errors = report.write_errors,
        "sink finished"
    );
    report
}
