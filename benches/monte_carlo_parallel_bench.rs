//! Compare sequential vs parallel Monte Carlo run times.
//!
//! Run with: `cargo bench --bench monte_carlo_parallel`
//! Or quick comparison: `cargo run --bin benchmark_parallel_speedup` (see src/bin)

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use warroom::combat::{BattleSetup, FortificationSnapshot, Rng, SimulationConfig};
use warroom::data::{Composition, UnitCatalog, UnitDefinition, UnitStats, UnitTypeId};
use warroom::optimizer::monte_carlo::Simulator;
use warroom::parallel::WorkerPool;

fn bench_monte_carlo_sequential_vs_parallel(c: &mut Criterion) {
    let catalog = UnitCatalog::new([
        UnitDefinition {
            id: UnitTypeId::new("legionnaire"),
            stats: UnitStats::new(40, 35, 50, 6.0, 50),
        },
        UnitDefinition {
            id: UnitTypeId::new("praetorian"),
            stats: UnitStats::new(30, 65, 35, 5.0, 20),
        },
    ])
    .expect("catalog");
    let simulator = Simulator::new(
        Arc::new(catalog),
        SimulationConfig::default(),
        WorkerPool::default_workers(),
    )
    .expect("simulator");
    let setup = BattleSetup::new(
        Composition::from_counts([("legionnaire", 600)]).expect("attacker"),
        Composition::from_counts([("praetorian", 400)]).expect("defender"),
        FortificationSnapshot::new(1.1, 0.0, 0.0).expect("fortification"),
    );
    let iterations = 50_000;

    let mut group = c.benchmark_group("monte_carlo");
    group.sample_size(20);
    group.measurement_time(std::time::Duration::from_secs(10));

    group.bench_function("sequential", |b| {
        b.iter(|| {
            black_box(
                simulator
                    .simulate_sequential(&setup, iterations, &mut Rng::new(42))
                    .expect("simulate"),
            )
        });
    });

    group.bench_function("parallel", |b| {
        b.iter(|| {
            black_box(
                simulator
                    .simulate(&setup, iterations, &mut Rng::new(42))
                    .expect("simulate"),
            )
        });
    });

    group.finish();
}

criterion_group!(benches, bench_monte_carlo_sequential_vs_parallel);
criterion_main!(benches);
