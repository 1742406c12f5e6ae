//! Pipeline configuration.
//!
//! All options have defined defaults; only the two paths must be supplied.
//! The config is immutable for the pipeline's lifetime — it is validated once
//! at startup and then owned by the controller.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::StartError;

/// Configuration for a tailing pipeline.
///
/// # Defaults
///
/// | Parameter | Default | Rationale |
/// |-----------|---------|-----------|
/// | `chunk_size` | 8 KiB | One read syscall per poll in the common case |
/// | `max_line_len` | 5000 | Longer records are truncated, not split |
/// | `poll_interval` | 100 ms | Idle-wait granularity; also bounds stop latency |
/// | `queue_capacity` | 1024 | Backpressure point between reader and sink |
/// | `initial_pool_size` | 32 | Pre-warmed line buffers; pool grows on demand |
///
/// # Memory Planning
///
/// Peak buffer memory ≈ `(queue_capacity + in-flight) × max_line_len`. The
/// pool grows to the peak concurrent line count and never shrinks, so a burst
/// sizes the pool for the rest of the run.
#[derive(Clone, Debug)]
pub struct Config {
    /// File to tail. Opened read-only; only bytes appended after startup are
    /// processed (the reader seeks to end-of-file before the first read).
    pub input_path: PathBuf,

    /// File matching lines are appended to. Created if absent.
    pub output_path: PathBuf,

    /// Bytes per read syscall on the tailing reader.
    ///
    /// Larger chunks reduce syscall overhead when the producer is bursty;
    /// the reader drains all available data before sleeping regardless.
    pub chunk_size: usize,

    /// Maximum emitted line length in bytes.
    ///
    /// A longer logical line is emitted once, truncated to this length, and
    /// the remainder up to the next terminator is discarded.
    pub max_line_len: usize,

    /// Sleep between read attempts when no new data is available.
    ///
    /// Also the upper bound on how long the reader takes to observe a stop
    /// request while idle.
    pub poll_interval: Duration,

    /// Keywords to filter on. A line is kept if it contains any keyword as a
    /// byte-exact substring. Empty list means "keep every line".
    ///
    /// Four or more keywords switch the matcher from per-keyword substring
    /// scans to a single-pass Aho–Corasick automaton.
    pub keywords: Vec<String>,

    /// Append `\t#MON_TS=<integer-nanoseconds-since-epoch>` to each written
    /// line, stamped at write time.
    pub stamp_lines: bool,

    /// Capacity of the bounded queue between reader and sink.
    ///
    /// When full, the reader blocks (backpressure) rather than dropping lines.
    pub queue_capacity: usize,

    /// Line buffers allocated up front. The pool grows past this on demand,
    /// so this only controls startup pre-warming.
    pub initial_pool_size: usize,

    /// Pin the reader thread to this core. Best-effort hint: pinning failures
    /// are logged and ignored. Linux only.
    pub reader_core: Option<usize>,

    /// Pin the sink thread to this core. Same semantics as `reader_core`.
    pub sink_core: Option<usize>,
}

impl Config {
    /// Creates a config for the given paths with all other fields defaulted.
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    /// Validates numeric fields.
    ///
    /// Paths are not checked here; opening them is the check, and open
    /// failures carry better context (`StartError::OpenInput`/`OpenOutput`).
    pub fn validate(&self) -> Result<(), StartError> {
        if self.chunk_size == 0 {
            return Err(StartError::InvalidConfig {
                field: "chunk_size",
                reason: "must be non-zero",
            });
        }
        if self.max_line_len == 0 {
            return Err(StartError::InvalidConfig {
                field: "max_line_len",
                reason: "must be non-zero",
            });
        }
        if self.queue_capacity == 0 {
            return Err(StartError::InvalidConfig {
                field: "queue_capacity",
                reason: "must be non-zero",
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            output_path: PathBuf::new(),
            chunk_size: 8 * 1024,
            max_line_len: 5000,
            poll_interval: Duration::from_millis(100),
            keywords: Vec::new(),
            stamp_lines: false,
            queue_capacity: 1024,
            initial_pool_size: 32,
            reader_core: None,
            sink_core: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::new("/tmp/in.log", "/tmp/out.log");
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 8192);
        assert_eq!(config.max_line_len, 5000);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert!(config.keywords.is_empty());
        assert!(!config.stamp_lines);
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let mut config = Config::new("in", "out");
        config.chunk_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn zero_max_line_len_rejected() {
        let mut config = Config::new("in", "out");
        config.max_line_len = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_queue_capacity_rejected() {
        let mut config = Config::new("in", "out");
        config.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_poll_interval_allowed() {
        // Busy polling is a valid (if hot) configuration.
        let mut config = Config::new("in", "out");
        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_ok());
    }
}
