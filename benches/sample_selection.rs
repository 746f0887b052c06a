//! Benchmarks for nearest-sample selection
//!
//! Tests selection performance for:
//! - Tables of typical per-lap sizes (a lap at ~4 Hz up to ~25 Hz)
//! - Offsets at the start, middle and end of the lap
//!
//! Platform: Cross-platform (synthetic telemetry, CI-safe)

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lapreplay::selector::{LapTelemetry, select};
use lapreplay::test_utils::{lap_table_every_second, resolution_at};
use lapreplay::types::LapRecord;
use std::hint::black_box;
use std::sync::Arc;

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_nearest");

    for rows in [360usize, 900, 2250] {
        let duration = rows as f64;
        let lap = LapRecord { lap_number: 1, start: 0.0, end: duration, duration };
        let telemetry = LapTelemetry::Loaded(Arc::new(lap_table_every_second(rows)));

        let offsets = [("head", 0.4), ("middle", duration / 2.0), ("tail", duration - 0.6)];
        for (name, offset) in offsets {
            let resolution = resolution_at(lap, offset);
            group.bench_with_input(
                BenchmarkId::new(name, rows),
                &resolution,
                |b, resolution| b.iter(|| black_box(select(&telemetry, resolution).unwrap())),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_select);
criterion_main!(benches);
