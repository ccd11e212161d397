//! Benchmarks for sliding-window frame statistics
//!
//! Snapshots recompute every window, so report cost grows with the sample
//! count of a long session.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use framebench::stats::{
    LONG_WINDOW, SHORT_WINDOW, SampleStore, performance_report, windowed_aggregate,
};
use framebench::test_utils::steady_samples;
use std::hint::black_box;

fn bench_windows(c: &mut Criterion) {
    let samples = steady_samples(10_000, 16);

    let mut group = c.benchmark_group("windowed_aggregate");
    for window in [Some(SHORT_WINDOW), Some(LONG_WINDOW), None] {
        let label = window.map_or_else(|| "all".to_string(), |w| w.to_string());
        group.bench_with_input(BenchmarkId::from_parameter(label), &window, |b, window| {
            b.iter(|| black_box(windowed_aggregate(black_box(&samples), *window)))
        });
    }
    group.finish();
}

fn bench_reports(c: &mut Criterion) {
    let mut group = c.benchmark_group("performance_report");
    for count in [100, 1_000, 100_000] {
        let samples = steady_samples(count, 16);
        group.bench_with_input(BenchmarkId::from_parameter(count), &samples, |b, samples| {
            b.iter(|| black_box(performance_report(black_box(samples))))
        });
    }
    group.finish();

    c.bench_function("sample_store_push", |b| {
        let mut store = SampleStore::with_capacity(1 << 16);
        let mut arrival_ms = 0;
        b.iter(|| {
            arrival_ms += 16;
            store.push(black_box(framebench::Sample::at(arrival_ms)));
        })
    });
}

criterion_group!(benches, bench_windows, bench_reports);
criterion_main!(benches);
