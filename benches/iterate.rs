use std::hint::black_box;

use criterion::*;

mod common;
use common::{Position, Velocity, Wealth};


fn iterate_benchmark(c: &mut Criterion) {
    let mut registry = common::setup_registry(common::AGENTS_MED).unwrap();

    let mut group = c.benchmark_group("iterate");
    group.throughput(Throughput::Elements(common::AGENTS_MED as u64));

    group.bench_function("integrate_position", |b| {
        b.iter(|| {
            registry
                .for_each2::<Position, Velocity>(|_, position, velocity| {
                    position.x += velocity.dx;
                    position.y += velocity.dy;
                })
                .unwrap();
        });
    });

    group.bench_function("sum_wealth", |b| {
        b.iter(|| {
            let mut total = 0.0f32;
            registry
                .for_each1::<Wealth>(|_, wealth| total += wealth.value)
                .unwrap();
            black_box(total);
        });
    });

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
