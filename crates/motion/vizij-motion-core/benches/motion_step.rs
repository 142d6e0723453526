use criterion::*;
use std::hint::black_box;

use vizij_motion_core::{Ease, Engine, LoopType, UpdatePhase};

const MOTIONS: usize = 10_000;

fn looping_engine(n: usize) -> Engine {
    let mut engine = Engine::default();
    for i in 0..n {
        engine
            .create([0.0f32; 3], [i as f32, 1.0, -1.0], 1.0 + (i % 4) as f64)
            .with_ease(Ease::InOutCubic)
            .with_loops(-1, LoopType::Yoyo)
            .bind(|v| {
                black_box(v);
            })
            .unwrap();
    }
    engine
}

fn step_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("motion_step");
    group.throughput(Throughput::Elements(MOTIONS as u64));

    group.bench_function("update_10k_vec3", |b| {
        let mut engine = looping_engine(MOTIONS);
        b.iter(|| engine.update(UpdatePhase::Update, black_box(1.0 / 60.0)));
    });

    group.bench_function("create_and_drain_10k", |b| {
        b.iter_batched(
            Engine::default,
            |mut engine| {
                for i in 0..MOTIONS {
                    engine.create(0.0f32, i as f32, 0.5).run().unwrap();
                }
                while engine.motion_count() > 0 {
                    engine.update(UpdatePhase::Update, 0.25);
                }
                engine
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, step_benchmark);
criterion_main!(benches);
