//! # Regeneration Benchmarks
//!
//! Performance benchmarks for geodash-core pipeline operations.
//!
//! Run with: `cargo bench -p geodash-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use geodash_core::{
    DVec2, Geometry, NodeSeed, Pipeline, PipelineConfig, ViewMode, generators, snap,
};
use std::hint::black_box;

/// Points on a spiral, one every 100 ms.
fn spiral(size: usize) -> Vec<NodeSeed> {
    (0..size)
        .map(|i| {
            let t = i as f64;
            let radius = 20.0 + 6.0 * t;
            NodeSeed::new(
                Geometry::point(radius * (t * 0.7).cos(), radius * (t * 0.7).sin()),
                t * 100.0,
            )
        })
        .collect()
}

fn pipeline(levels: usize) -> Pipeline {
    let mut pipeline = Pipeline::new(PipelineConfig {
        max_objects: 2000,
        acceptable_difference: 2.0,
        inception_levels: levels,
    })
    .expect("pipeline");
    for generator in generators::builtin() {
        pipeline.register(generator).expect("register");
    }
    pipeline
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_initial_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("initial_generation");

    for size in [4, 8, 16].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut pipeline = pipeline(2);
                pipeline.update_inputs(spiral(size));
                black_box(pipeline)
            });
        });
    }

    group.finish();
}

fn bench_stable_regeneration(c: &mut Criterion) {
    let mut group = c.benchmark_group("stable_regeneration");

    for size in [4, 8, 16].iter() {
        let mut pipeline = pipeline(2);
        pipeline.update_inputs(spiral(*size));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(pipeline.regenerate()));
        });
    }

    group.finish();
}

fn bench_input_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("input_edit");

    for size in [4, 8, 16].iter() {
        let mut pipeline = pipeline(2);
        let full = spiral(*size);
        let trimmed = full[1..].to_vec();
        pipeline.update_inputs(full.clone());

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                pipeline.update_inputs(trimmed.clone());
                black_box(pipeline.update_inputs(full.clone()))
            });
        });
    }

    group.finish();
}

fn bench_snap(c: &mut Criterion) {
    let mut group = c.benchmark_group("snap");

    for size in [8, 16].iter() {
        let mut pipeline = pipeline(2);
        pipeline.update_inputs(spiral(*size));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                black_box(snap(
                    &pipeline,
                    DVec2::new(12.0, -7.0),
                    ViewMode::AllLayers,
                    50.0,
                ))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_initial_generation,
    bench_stable_regeneration,
    bench_input_edit,
    bench_snap,
);

criterion_main!(benches);
