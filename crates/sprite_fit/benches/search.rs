mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use sprite_fit::prelude::{RunConfig, SearchRunner};

const GRID_SIZES: [usize; 3] = [8, 16, 32];
const WIDTH: u32 = 96;
const HEIGHT: u32 = 64;

fn search_benches(c: &mut Criterion) {
    let target = common::gradient_target(WIDTH, HEIGHT);
    let atlas = common::atlas();

    let mut group = c.benchmark_group("search/round");
    for &grid in &GRID_SIZES {
        let config = RunConfig::for_target(&target)
            .with_grid_size(grid)
            .with_iterations_per_round(16)
            .with_sprite_limit(1)
            .with_round_limit(Some(1));
        group.throughput(common::elements_throughput(
            config.slot_count() * config.iterations_per_round,
        ));

        group.bench_with_input(BenchmarkId::from_parameter(grid), &grid, |b, _| {
            b.iter_batched(
                || SearchRunner::new(config.clone(), &target, &atlas),
                |mut runner| black_box(runner.run()),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = search_benches
}
criterion_main!(benches);
