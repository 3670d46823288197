//! Pathfinding and movement range benchmarks for tactics_core.
//!
//! Run with: `cargo bench -p tactics_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tactics_core::prelude::*;

/// Grid with staggered wall columns that force long detours.
fn maze(size: u32) -> Grid {
    let side = size as i32;
    let walls = (2..side - 1).step_by(4).flat_map(move |x| {
        let gap = if (x / 4) % 2 == 0 { side - 1 } else { 0 };
        (0..side).filter(move |&y| y != gap).map(move |y| TilePos::new(x, y))
    });
    Grid::with_walls(size, size, walls)
}

pub fn pathfinding_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_path_uncached");
    for size in [16u32, 64, 128] {
        let grid = maze(size);
        let goal = TilePos::new(size as i32 - 1, size as i32 - 1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &grid, |b, grid| {
            b.iter(|| {
                find_path_uncached(grid, black_box(TilePos::new(0, 0)), black_box(goal), true, 5)
            })
        });
    }
    group.finish();

    c.bench_function("find_path_cached_64", |b| {
        let grid = maze(64);
        let mut pathfinder = Pathfinder::default();
        let now = Instant::now();
        let goal = TilePos::new(63, 63);
        pathfinder.find_path_at(&grid, TilePos::new(0, 0), goal, now);
        b.iter(|| pathfinder.find_path_at(&grid, black_box(TilePos::new(0, 0)), goal, now))
    });
}

pub fn movement_range_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("movement_range");
    let grid = maze(64);
    for ap in [4u32, 12, 24] {
        group.bench_with_input(BenchmarkId::from_parameter(ap), &ap, |b, &ap| {
            b.iter(|| {
                calculate_movement_range(&grid, black_box(TilePos::new(0, 0)), ap, StepCosts::default())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, pathfinding_benchmark, movement_range_benchmark);
criterion_main!(benches);
