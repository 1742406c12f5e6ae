//! Log Tail CLI
//!
//! Tails a growing log file and appends the lines containing any of the
//! given keywords to an output file, optionally stamped with a wall-clock
//! timestamp. Runs until interrupted.
//!
//! # Output Format
//!
//! Matching lines are appended to the output file as:
//! `<line>` or, with `--stamp`, `<line>\t#MON_TS=<nanoseconds-since-epoch>`
//!
//! Statistics are written to stderr upon completion:
//! `lines=N matched=N written=N truncated=N bytes=N elapsed_ms=N`
//!
//! # Exit Codes
//!
//! - `0`: Clean shutdown after SIGINT/SIGTERM
//! - `1`: Pipeline failed to start
//! - `2`: Invalid arguments

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use logtail_rs::{Config, LogPipeline};

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_sig: libc::c_int) {
    // Async-signal-safe: set the flag, let the main loop do the work.
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_signal_handlers() {
    // SAFETY: on_signal only touches an atomic, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, on_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_signal as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_signal_handlers() {}

fn print_usage(exe: &std::ffi::OsStr) {
    eprintln!(
        "usage: {} [OPTIONS] <input-file> <output-file>

Tails <input-file> (new content only) and appends matching lines to
<output-file>.

OPTIONS:
    --keyword=<word>        Keep lines containing this substring (repeatable;
                            no keywords keeps every line)
    --stamp                 Append \\t#MON_TS=<nanos-since-epoch> to each line
    --chunk-size=<N>        Bytes per read (default: 8192)
    --max-line-len=<N>      Truncate longer lines to N bytes (default: 5000)
    --poll-interval-ms=<N>  Idle sleep between reads (default: 100)
    --queue-capacity=<N>    Bounded queue size in lines (default: 1024)
    --pool-size=<N>         Pre-allocated line buffers (default: 32)
    --reader-core=<N>       Pin the reader thread to this core (Linux)
    --sink-core=<N>         Pin the sink thread to this core (Linux)
    --help, -h              Show this help message",
        exe.to_string_lossy()
    );
}

fn parse_number(flag: &str, value: &str) -> usize {
    value.parse().unwrap_or_else(|_| {
        eprintln!("invalid {flag} value: {value}");
        std::process::exit(2);
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args_os();
    let exe = args.next().unwrap_or_else(|| "logtail-rs".into());
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut config = Config::default();

    for arg in args {
        if let Some(flag) = arg.to_str() {
            if let Some(value) = flag.strip_prefix("--keyword=") {
                config.keywords.push(value.to_string());
                continue;
            }
            if let Some(value) = flag.strip_prefix("--chunk-size=") {
                config.chunk_size = parse_number("--chunk-size", value);
                continue;
            }
            if let Some(value) = flag.strip_prefix("--max-line-len=") {
                config.max_line_len = parse_number("--max-line-len", value);
                continue;
            }
            if let Some(value) = flag.strip_prefix("--poll-interval-ms=") {
                config.poll_interval =
                    Duration::from_millis(parse_number("--poll-interval-ms", value) as u64);
                continue;
            }
            if let Some(value) = flag.strip_prefix("--queue-capacity=") {
                config.queue_capacity = parse_number("--queue-capacity", value);
                continue;
            }
            if let Some(value) = flag.strip_prefix("--pool-size=") {
                config.initial_pool_size = parse_number("--pool-size", value);
                continue;
            }
            if let Some(value) = flag.strip_prefix("--reader-core=") {
                config.reader_core = Some(parse_number("--reader-core", value));
                continue;
            }
            if let Some(value) = flag.strip_prefix("--sink-core=") {
                config.sink_core = Some(parse_number("--sink-core", value));
                continue;
            }
            match flag {
                "--stamp" => {
                    config.stamp_lines = true;
                    continue;
                }
                "--help" | "-h" => {
                    print_usage(&exe);
                    return;
                }
                _ if flag.starts_with("--") => {
                    eprintln!("unknown option: {flag}");
                    print_usage(&exe);
                    std::process::exit(2);
                }
                _ => {}
            }
        }
        paths.push(PathBuf::from(arg));
    }

    let [input, output] = <[PathBuf; 2]>::try_from(paths).unwrap_or_else(|got| {
        eprintln!("expected exactly 2 paths, got {}", got.len());
        print_usage(&exe);
        std::process::exit(2);
    });
    config.input_path = input;
    config.output_path = output;

    install_signal_handlers();
    let start = Instant::now();

    let mut pipeline = match LogPipeline::start(config) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    while !STOP_REQUESTED.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    let report = pipeline.stop();
    let elapsed_ms = start.elapsed().as_millis();
    eprintln!(
        "lines={} matched={} written={} truncated={} bytes={} elapsed_ms={}",
        report.lines_completed,
        report.lines_matched,
        report.lines_written,
        report.lines_truncated,
        report.bytes_read,
        elapsed_ms
    );
    if report.write_errors > 0 {
        eprintln!("write_errors={}", report.write_errors);
    }
}
