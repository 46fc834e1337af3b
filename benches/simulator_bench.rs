//! Simulator throughput benchmarks: trials per second for small and large battles.
//!
//! Run with: `cargo bench`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use warroom::combat::{BattleSetup, FortificationSnapshot, Rng, SimulationConfig};
use warroom::data::{Composition, UnitCatalog, UnitDefinition, UnitStats, UnitTypeId};
use warroom::optimizer::monte_carlo::Simulator;
use warroom::parallel::WorkerPool;

fn simulator() -> Simulator {
    let catalog = UnitCatalog::new([
        UnitDefinition {
            id: UnitTypeId::new("legionnaire"),
            stats: UnitStats::new(40, 35, 50, 6.0, 50),
        },
        UnitDefinition {
            id: UnitTypeId::new("militia"),
            stats: UnitStats::new(10, 10, 5, 7.0, 20),
        },
    ])
    .expect("catalog");
    Simulator::new(
        Arc::new(catalog),
        SimulationConfig::default(),
        WorkerPool::default_workers(),
    )
    .expect("simulator")
}

fn battle(attackers: u32, defenders: u32) -> BattleSetup {
    BattleSetup::new(
        Composition::from_counts([("legionnaire", attackers)]).expect("attacker"),
        Composition::from_counts([("militia", defenders)]).expect("defender"),
        FortificationSnapshot::new(1.2, 40.0, 10.0).expect("fortification"),
    )
}

fn bench_simulator(c: &mut Criterion) {
    let simulator = simulator();
    let iterations = 10_000u32;

    let mut group = c.benchmark_group("simulator");
    group.sample_size(50);
    group.throughput(Throughput::Elements(u64::from(iterations)));

    // Small skirmish, exponent fixed at 1.5
    let small = battle(50, 120);
    group.bench_function("skirmish_10k_trials", |b| {
        b.iter(|| {
            black_box(
                simulator
                    .simulate(&small, iterations, &mut Rng::new(7))
                    .expect("simulate"),
            )
        });
    });

    // Large battle, exponent scaled by army size
    let large = battle(20_000, 45_000);
    group.bench_function("siege_10k_trials", |b| {
        b.iter(|| {
            black_box(
                simulator
                    .simulate(&large, iterations, &mut Rng::new(7))
                    .expect("simulate"),
            )
        });
    });

    group.finish();
}

criterion_group!(benches, bench_simulator);
criterion_main!(benches);
