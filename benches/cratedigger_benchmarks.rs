//! Benchmarks for the pure hot paths: scoring, the filter pipeline and
//! round-robin diversity selection. Everything here runs against
//! synthetic in-memory pools; no backend is involved.
//!
//! ```bash
//! cargo bench
//! cargo bench filter
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use cratedigger::constraints::ConstraintSet;
use cratedigger::filter::{apply, round_robin_select};
use cratedigger::scoring::smart_score;
use cratedigger::track::Track;
use serde_json::json;

/// Synthetic pool with a realistic artist/genre/BPM spread.
fn synthetic_pool(size: usize) -> Vec<Track> {
    (0..size)
        .map(|i| {
            Track::from_raw(&json!({
                "id": format!("t{i}"),
                "title": format!("Track {i}"),
                "artist": format!("Artist {}", i % 25),
                "genre": if i % 3 == 0 { "Rock" } else { "Ambient" },
                "bpm": (i % 5) * 40,
                "playCount": i % 50,
                "userRating": i % 6,
            }))
            .expect("synthetic record has an id")
        })
        .collect()
}

fn bench_scoring(c: &mut Criterion) {
    let pool = synthetic_pool(1000);
    c.bench_function("smart_score_1000", |b| {
        b.iter(|| {
            let total: u32 = pool.iter().map(|t| smart_score(black_box(t))).sum();
            black_box(total)
        });
    });
}

fn bench_filter_pipeline(c: &mut Criterion) {
    let constraints = ConstraintSet {
        exclude_genres: vec!["Rock".to_string()],
        min_bpm: Some(40),
        max_bpm: Some(160),
        max_tracks_per_artist: Some(3),
        ..ConstraintSet::default()
    };

    let mut group = c.benchmark_group("filter_pipeline");
    for size in [100usize, 500, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let pool = synthetic_pool(size);
            b.iter(|| {
                apply(
                    black_box(pool.clone()),
                    black_box(&constraints),
                    50,
                    false,
                    "bench",
                )
            });
        });
    }
    group.finish();
}

fn bench_round_robin(c: &mut Criterion) {
    let pool = synthetic_pool(1000);
    c.bench_function("round_robin_1000_to_50", |b| {
        b.iter(|| round_robin_select(black_box(pool.clone()), Some(2), 50, true));
    });
}

criterion_group!(benches, bench_scoring, bench_filter_pipeline, bench_round_robin);
criterion_main!(benches);
