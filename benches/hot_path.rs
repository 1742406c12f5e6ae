//! Benchmarks for the per-byte hot path: line framing and keyword matching.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use logtail_rs::framer::LineFramer;
use logtail_rs::{BufferPool, KeywordMatcher, LineQueue};

/// Builds a corpus of `lines` log lines averaging ~80 bytes.
fn synthetic_log(lines: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(lines * 80);
    for i in 0..lines {
        let level = match i % 10 {
            0 => "ERROR",
            1..=2 => "WARN",
            _ => "INFO",
        };
        out.extend_from_slice(
            format!("2026-08-27T12:00:{:02}.{:06}Z {level} svc=frontend req={i} handled request in {}us\n",
                i % 60, i % 1_000_000, i * 7 % 9000)
                .as_bytes(),
        );
    }
    out
}

fn bench_framer(c: &mut Criterion) {
    let corpus = synthetic_log(10_000);
    let mut group = c.benchmark_group("framer");
    group.throughput(Throughput::Bytes(corpus.len() as u64));

    for chunk_size in [4096usize, 8192, 65536] {
        group.bench_with_input(
            BenchmarkId::new("feed", chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                let pool = BufferPool::new(5000, 32);
                // Capacity above the line count so pushes never block.
                let queue = LineQueue::new(16_384);
                b.iter(|| {
                    let mut framer = LineFramer::new(5000, &pool);
                    for chunk in corpus.chunks(chunk_size) {
                        assert!(framer.feed(black_box(chunk), &pool, &queue).is_continue());
                    }
                    framer.finish(&pool);
                    // Single-threaded: every queued line pops without blocking.
                    for _ in 0..queue.len() {
                        if let Some(line) = queue.pop() {
                            pool.release(line);
                        }
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_matcher(c: &mut Criterion) {
    let corpus = synthetic_log(10_000);
    let lines: Vec<&[u8]> = corpus.split(|&b| b == b'\n').filter(|l| !l.is_empty()).collect();
    let bytes: u64 = lines.iter().map(|l| l.len() as u64).sum();

    let mut group = c.benchmark_group("matcher");
    group.throughput(Throughput::Bytes(bytes));

    let cases: &[(&str, &[&str])] = &[
        ("scan_1kw", &["ERROR"]),
        ("scan_3kw", &["ERROR", "WARN", "FATAL"]),
        ("automaton_5kw", &["ERROR", "WARN", "FATAL", "PANIC", "ABORT"]),
        ("automaton_8kw", &[
            "ERROR", "WARN", "FATAL", "PANIC", "ABORT", "timeout", "refused", "denied",
        ]),
    ];

    for (name, keywords) in cases {
        let matcher =
            KeywordMatcher::new(&keywords.iter().map(|k| k.to_string()).collect::<Vec<_>>());
        group.bench_function(*name, |b| {
            b.iter(|| {
                let mut hits = 0u64;
                for line in &lines {
                    if matcher.matches(black_box(line)) {
                        hits += 1;
                    }
                }
                black_box(hits)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_framer, bench_matcher);
criterion_main!(benches);
