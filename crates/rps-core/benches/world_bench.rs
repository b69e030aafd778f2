use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rps_core::{NullSound, SimulationConfig, WorldState};
use std::time::Duration;

fn bench_world_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    let samples: usize = std::env::var("RPS_BENCH_SAMPLES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(30);
    group.sample_size(samples);
    group.measurement_time(Duration::from_secs(5));
    let steps: usize = std::env::var("RPS_BENCH_STEPS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(32);
    let piece_counts: Vec<usize> = std::env::var("RPS_BENCH_PIECES")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|t| t.trim().parse::<usize>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| vec![125_usize, 500, 2000]);

    for &pieces in &piece_counts {
        group.bench_function(format!("steps{steps}_pieces{pieces}"), |b| {
            b.iter_batched(
                || {
                    let config = SimulationConfig {
                        piece_count: pieces,
                        rng_seed: Some(0xBEEF),
                        ..SimulationConfig::default()
                    };
                    WorldState::new(config).expect("world")
                },
                |mut world| {
                    for _ in 0..steps {
                        world.step(&mut NullSound);
                    }
                    world
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_world_steps);
criterion_main!(benches);
