//! Monte Carlo battle simulator.
//!
//! Trials are split into fixed-size batches. Each batch gets its own random
//! stream forked from the caller's source, folds its trials into a
//! [SummaryAccumulator], and the partials are merged in batch order. Batch
//! layout depends only on the iteration count and `trials_per_batch`, so a
//! seeded run gives the same summary with one thread or many.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::combat::engine::{BattleSetup, BattleTrialResult, ResolvedBattle, SimulationConfig};
use crate::combat::power::DefenseSelectionPolicy;
use crate::combat::rng::RandomSource;
use crate::data::unit::UnitCatalog;
use crate::error::{EngineError, EngineResult};
use crate::optimizer::summary::{SimulationSummary, SummaryAccumulator};
use crate::parallel::batch::{batch_count, batch_ranges};
use crate::parallel::WorkerPool;

#[derive(Debug, Clone)]
pub struct Simulator {
    catalog: Arc<UnitCatalog>,
    config: SimulationConfig,
    policy: Arc<dyn DefenseSelectionPolicy>,
    pool: WorkerPool,
}

impl Simulator {
    /// Build a simulator using the defense policy named in `config`.
    pub fn new(
        catalog: Arc<UnitCatalog>,
        config: SimulationConfig,
        pool: WorkerPool,
    ) -> EngineResult<Self> {
        config.validate()?;
        let policy: Arc<dyn DefenseSelectionPolicy> = Arc::from(config.defense_policy.policy());
        Ok(Self {
            catalog,
            config,
            policy,
            pool,
        })
    }

    /// Replace the defense policy with any implementation.
    pub fn with_policy(self, policy: Arc<dyn DefenseSelectionPolicy>) -> Self {
        Self { policy, ..self }
    }

    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn policy(&self) -> &dyn DefenseSelectionPolicy {
        self.policy.as_ref()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Run `iterations` trials of `setup` on the worker pool.
    #[instrument(skip_all, fields(iterations = iterations))]
    pub fn simulate<R>(
        &self,
        setup: &BattleSetup,
        iterations: u32,
        rng: &mut R,
    ) -> EngineResult<SimulationSummary>
    where
        R: RandomSource + Send,
    {
        self.pool
            .install(|| self.evaluate(setup, iterations, rng, Execution::Parallel))
    }

    /// Same batches and streams as [Simulator::simulate], run on the calling
    /// thread. Produces an identical summary for the same seed.
    pub fn simulate_sequential<R>(
        &self,
        setup: &BattleSetup,
        iterations: u32,
        rng: &mut R,
    ) -> EngineResult<SimulationSummary>
    where
        R: RandomSource + Send,
    {
        self.evaluate(setup, iterations, rng, Execution::Sequential)
    }

    /// Like [Simulator::simulate_sequential] but also returns every trial, in
    /// order. Memory grows with `iterations`; meant for debugging.
    pub fn simulate_with_trials<R>(
        &self,
        setup: &BattleSetup,
        iterations: u32,
        rng: &mut R,
    ) -> EngineResult<(SimulationSummary, Vec<BattleTrialResult>)>
    where
        R: RandomSource + Send,
    {
        let battle = self.prepare(setup, iterations)?;
        let mut trials = Vec::with_capacity(iterations as usize);
        let mut total = SummaryAccumulator::new(&battle);
        if battle.is_trivial() {
            total.record_idle(iterations);
            trials.resize(iterations as usize, BattleTrialResult::idle());
        } else {
            for ((start, end), mut stream) in self.batches(iterations, rng) {
                let mut partial = SummaryAccumulator::new(&battle);
                for _ in start..end {
                    let trial = battle.run_trial(&self.config, &mut stream);
                    partial.record(&trial);
                    trials.push(trial);
                }
                total = total.merge(partial);
            }
        }
        Ok((total.finish(&battle, self.policy.name()), trials))
    }

    /// Shared by [Simulator::simulate] and the optimizer, which already runs
    /// inside the pool and must not install it again per candidate.
    pub(crate) fn evaluate<R>(
        &self,
        setup: &BattleSetup,
        iterations: u32,
        rng: &mut R,
        execution: Execution,
    ) -> EngineResult<SimulationSummary>
    where
        R: RandomSource + Send,
    {
        let battle = self.prepare(setup, iterations)?;
        if battle.is_trivial() {
            debug!("both armies empty, recording draws");
            let mut idle = SummaryAccumulator::new(&battle);
            idle.record_idle(iterations);
            return Ok(idle.finish(&battle, self.policy.name()));
        }

        let batches = self.batches(iterations, rng);
        debug!(batches = batches.len(), "running trial batches");
        let run_batch = |((start, end), mut stream): ((usize, usize), R)| {
            let mut partial = SummaryAccumulator::new(&battle);
            for _ in start..end {
                partial.record(&battle.run_trial(&self.config, &mut stream));
            }
            partial
        };
        let partials: Vec<SummaryAccumulator> = match execution {
            Execution::Parallel => batches.into_par_iter().map(run_batch).collect(),
            Execution::Sequential => batches.into_iter().map(run_batch).collect(),
        };

        let total = partials
            .into_iter()
            .fold(SummaryAccumulator::new(&battle), SummaryAccumulator::merge);
        Ok(total.finish(&battle, self.policy.name()))
    }

    /// Validate inputs and resolve the battle, before any randomness is drawn.
    fn prepare<'a>(
        &'a self,
        setup: &'a BattleSetup,
        iterations: u32,
    ) -> EngineResult<ResolvedBattle<'a>> {
        if iterations == 0 {
            return Err(EngineError::invalid_input("iterations must be >= 1"));
        }
        ResolvedBattle::new(setup, &self.catalog, self.policy.as_ref())
    }

    /// Batch boundaries paired with one child stream each, forked in batch order.
    fn batches<R: RandomSource>(&self, iterations: u32, rng: &mut R) -> Vec<((usize, usize), R)> {
        let iterations = iterations as usize;
        let count = batch_count(iterations, self.config.trials_per_batch as usize);
        batch_ranges(iterations, count)
            .into_iter()
            .map(|range| (range, rng.fork()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Execution {
    Parallel,
    Sequential,
}
