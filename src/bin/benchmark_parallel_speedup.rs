//! Run the optimizer once on a single worker and once on the full pool, then
//! print timings and speedup.
//!
//! Usage: cargo run --release --bin benchmark_parallel_speedup

use std::sync::Arc;
use std::time::Instant;

use warroom::combat::{FortificationSnapshot, Rng, SimulationConfig};
use warroom::data::{Composition, UnitCatalog, UnitDefinition, UnitStats, UnitTypeId};
use warroom::optimizer::monte_carlo::Simulator;
use warroom::optimizer::{OptimizationRequest, OptimizationSide, Optimizer, OptimizerConfig};
use warroom::parallel::WorkerPool;

fn optimizer(catalog: &Arc<UnitCatalog>, pool: WorkerPool) -> Optimizer {
    let simulator = Simulator::new(Arc::clone(catalog), SimulationConfig::default(), pool)
        .expect("benchmark simulator");
    Optimizer::new(simulator, OptimizerConfig::default()).expect("benchmark optimizer")
}

fn main() {
    let seed = 12345u64;
    let iterations = 1000;
    let catalog = Arc::new(
        UnitCatalog::new([
            UnitDefinition {
                id: UnitTypeId::new("legionnaire"),
                stats: UnitStats::new(40, 35, 50, 6.0, 50),
            },
            UnitDefinition {
                id: UnitTypeId::new("praetorian"),
                stats: UnitStats::new(30, 65, 35, 5.0, 20),
            },
            UnitDefinition {
                id: UnitTypeId::new("imperian"),
                stats: UnitStats::new(70, 40, 25, 7.0, 50),
            },
        ])
        .expect("benchmark catalog"),
    );
    let request = OptimizationRequest::new(
        OptimizationSide::Attacker,
        Composition::from_counts([("praetorian", 300), ("legionnaire", 200)]).expect("defender"),
        FortificationSnapshot::new(1.3, 50.0, 0.0).expect("fortification"),
        600,
        iterations,
    );

    let full_pool = WorkerPool::default_workers();
    println!(
        "Optimizer: {} troops × {} iterations per candidate ({} workers)",
        request.total_troops,
        iterations,
        full_pool.workers()
    );
    println!();

    // Single worker
    let t0 = Instant::now();
    let single = optimizer(&catalog, WorkerPool::with_workers(1))
        .optimize(&request, &mut Rng::new(seed))
        .expect("single-worker run");
    let elapsed_single = t0.elapsed();
    let single_ms = elapsed_single.as_secs_f64() * 1000.0;
    let trials = single.candidates_evaluated as f64 * f64::from(iterations);
    println!("Single:      {:.2} ms  ({:.1} trials/s)", single_ms, trials / elapsed_single.as_secs_f64());

    // Full pool
    let t0 = Instant::now();
    let parallel = optimizer(&catalog, full_pool)
        .optimize(&request, &mut Rng::new(seed))
        .expect("parallel run");
    let elapsed_par = t0.elapsed();
    let par_ms = elapsed_par.as_secs_f64() * 1000.0;
    println!("Parallel:    {:.2} ms  ({:.1} trials/s)", par_ms, trials / elapsed_par.as_secs_f64());

    let speedup = single_ms / par_ms;
    println!();
    println!("Speedup:     {:.2}x faster (parallel vs single worker)", speedup);

    assert_eq!(single, parallel, "seeded results must not depend on worker count");
    println!("(Results match single vs parallel)");
}
