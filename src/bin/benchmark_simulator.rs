//! Run simulator benchmark and optionally append one line to a log file for trend tracking.
//!
//! Usage:
//!   cargo run --release --bin benchmark_simulator
//!   cargo run --release --bin benchmark_simulator -- --log
//!
//! --log  Append one row to benchmark_log.csv (date, trials_per_sec, trials_per_min, units_per_trial, workers).

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use warroom::combat::{
    compute_defense, BattleSetup, DefenseConfig, FortificationInputs, Rng, SimulationConfig,
};
use warroom::data::{Composition, ResourceKind, ResourceStock, UnitCatalog, UnitDefinition, UnitStats, UnitTypeId};
use warroom::optimizer::monte_carlo::Simulator;
use warroom::parallel::WorkerPool;

fn main() {
    let log = std::env::args().any(|a| a == "--log");

    let catalog = UnitCatalog::new([
        UnitDefinition {
            id: UnitTypeId::new("legionnaire"),
            stats: UnitStats::new(40, 35, 50, 6.0, 50),
        },
        UnitDefinition {
            id: UnitTypeId::new("praetorian"),
            stats: UnitStats::new(30, 65, 35, 5.0, 20),
        },
        UnitDefinition {
            id: UnitTypeId::new("militia"),
            stats: UnitStats::new(10, 10, 5, 7.0, 20),
        },
    ])
    .expect("benchmark catalog");
    let fortification = compute_defense(
        &FortificationInputs {
            wall_level: 10,
            residence_level: 5,
            ..FortificationInputs::default()
        },
        &DefenseConfig::default(),
    )
    .expect("benchmark fortification");
    let setup = BattleSetup::new(
        Composition::from_counts([("legionnaire", 800), ("praetorian", 200)]).expect("attacker"),
        Composition::from_counts([("praetorian", 400), ("militia", 600)]).expect("defender"),
        fortification,
    )
    .with_resources(ResourceStock::new([
        (ResourceKind::Lumber, 5000),
        (ResourceKind::Crop, 3000),
    ]));
    let units_per_trial = setup.attacker.total_troops() + setup.defender.total_troops();

    let pool = WorkerPool::default_workers();
    let workers = pool.workers();
    let simulator = Simulator::new(Arc::new(catalog), SimulationConfig::default(), pool)
        .expect("benchmark simulator");

    // Run for at least this long or this many trials
    const MIN_DURATION_MS: u128 = 2000;
    const MIN_TRIALS: u64 = 100_000;
    const ITERATIONS_PER_CALL: u32 = 10_000;

    let mut rng = Rng::new(7);
    let start = Instant::now();
    let mut trials: u64 = 0;
    while start.elapsed().as_millis() < MIN_DURATION_MS || trials < MIN_TRIALS {
        let summary = simulator
            .simulate(&setup, ITERATIONS_PER_CALL, &mut rng)
            .expect("simulate");
        trials += u64::from(summary.iterations);
    }
    let elapsed_secs = start.elapsed().as_secs_f64();

    let trials_per_sec = trials as f64 / elapsed_secs;
    let trials_per_min = trials_per_sec * 60.0;

    println!("Simulator benchmark ({} units/trial, {} workers):", units_per_trial, workers);
    println!("  Trials:     {}", trials);
    println!("  Duration:   {:.2} s", elapsed_secs);
    println!("  Trials/s:   {:.2}", trials_per_sec);
    println!("  Trials/min: {:.2}", trials_per_min);

    if log {
        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!(
            "{},{:.4},{:.4},{},{}\n",
            date, trials_per_sec, trials_per_min, units_per_trial, workers
        );
        let path = "benchmark_log.csv";
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .expect("open benchmark_log.csv for append");
        if file.metadata().map(|m| m.len() == 0).unwrap_or(true) {
            let _ = file.write_all(b"date,trials_per_sec,trials_per_min,units_per_trial,workers\n");
        }
        file.write_all(line.as_bytes())
            .expect("write benchmark_log.csv");
        file.flush().expect("flush benchmark_log.csv");
        println!("Appended to {}", path);
    }
}
