//! Performance benchmarks for tracecompare.
//!
//! Run with: `cargo bench --features synthetic`
//!
//! Tracks come from the synthetic generator, so every run compares the same
//! reference/challenger pairs.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tracecompare::kpi::{find_worst_window, progress_table};
use tracecompare::synthetic::{DetourSpan, SyntheticPair};
use tracecompare::{CompareConfig, annotate_missed, compare_batch, compare_tracks, match_tracks};

fn pair(length_meters: f64) -> SyntheticPair {
    SyntheticPair {
        length_meters,
        gps_noise_sigma_meters: 2.0,
        detours: vec![DetourSpan {
            from_meters: length_meters * 0.4,
            to_meters: length_meters * 0.45,
            offset_meters: 300.0,
        }],
        ..SyntheticPair::default()
    }
}

/// Full pipeline on growing track lengths.
fn bench_compare_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare_scaling");
    group.sample_size(10);
    let config = CompareConfig::default();

    for km in [10, 50, 100] {
        let tracks = pair(km as f64 * 1000.0).generate();
        group.bench_with_input(BenchmarkId::new("compare_tracks", km), &tracks, |b, t| {
            b.iter(|| compare_tracks(black_box(&t.reference), black_box(&t.challenger), &config))
        });
    }

    group.finish();
}

/// Matching alone, and the KPI stages on pre-matched data.
fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");
    let config = CompareConfig::default();
    let tracks = pair(50_000.0).generate();

    group.bench_function("match_50km", |b| {
        b.iter(|| match_tracks(black_box(&tracks.reference), black_box(&tracks.challenger), &config))
    });

    let matched = match_tracks(&tracks.reference, &tracks.challenger, &config)
        .expect("synthetic tracks always match");
    let annotated = annotate_missed(&matched, &config);
    let progress = progress_table(&annotated);

    group.bench_function("annotate_50km", |b| {
        b.iter(|| annotate_missed(black_box(&matched), &config))
    });
    group.bench_function("worst_window_50km", |b| {
        b.iter(|| find_worst_window(black_box(&progress), config.rolling_duration_hours))
    });

    group.finish();
}

/// Many challengers against one reference.
fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    group.sample_size(10);
    let config = CompareConfig::default();
    let reference = pair(20_000.0).generate().reference;
    let challengers: Vec<_> = (0..16u64)
        .map(|seed| {
            SyntheticPair {
                seed,
                speed_kmh: 8.0 + seed as f64 * 0.5,
                ..pair(20_000.0)
            }
            .generate()
            .challenger
        })
        .collect();

    group.bench_function("compare_batch_16x20km", |b| {
        b.iter(|| compare_batch(black_box(&reference), black_box(&challengers), &config))
    });

    group.finish();
}

criterion_group!(benches, bench_compare_scaling, bench_stages, bench_batch);
criterion_main!(benches);
