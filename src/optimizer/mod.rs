pub mod candidate_generator;
pub mod export_csv;
pub mod monte_carlo;
pub mod ranking;
pub mod summary;
pub mod tiered;

use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::combat::defense::FortificationSnapshot;
use crate::combat::engine::{BattleSetup, SimulationConfig};
use crate::combat::rng::RandomSource;
use crate::data::composition::Composition;
use crate::data::resources::ResourceStock;
use crate::data::unit::{UnitCatalog, UnitTypeId};
use crate::error::{EngineError, EngineResult};
use crate::optimizer::candidate_generator::{CandidateStrategy, CompositionGenerator};
use crate::optimizer::monte_carlo::{Execution, Simulator};
use crate::optimizer::ranking::{rank_results, ranked_view, CandidateEvaluation, RankedCandidate};
use crate::optimizer::summary::SimulationSummary;
use crate::parallel::{batch_ranges, WorkerPool};

/// Number of progress-reporting batches for optimize-with-progress.
const OPTIMIZE_PROGRESS_BATCH_COUNT: usize = 40;

/// Which side of the battle the optimizer allocates troops for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationSide {
    /// Search an attacking army against a fixed defender.
    #[default]
    Attacker,
    /// Search a garrison against a fixed attacker.
    Defender,
}

impl OptimizationSide {
    pub fn win_rate(self, summary: &SimulationSummary) -> f64 {
        match self {
            Self::Attacker => summary.attacker_win_rate,
            Self::Defender => summary.defender_win_rate,
        }
    }

    pub fn loss_ratio(self, summary: &SimulationSummary) -> f64 {
        match self {
            Self::Attacker => summary.attacker_loss_ratio,
            Self::Defender => summary.defender_loss_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    #[serde(default)]
    pub side: OptimizationSide,
    /// The fixed army on the other side.
    pub opponent: Composition,
    #[serde(default)]
    pub fortification: FortificationSnapshot,
    #[serde(default)]
    pub defender_resources: ResourceStock,
    pub total_troops: u32,
    pub iterations_per_trial: u32,
    /// Unit types candidates may use; every catalog unit when `None`.
    #[serde(default)]
    pub unit_pool: Option<Vec<UnitTypeId>>,
}

impl OptimizationRequest {
    pub fn new(
        side: OptimizationSide,
        opponent: Composition,
        fortification: FortificationSnapshot,
        total_troops: u32,
        iterations_per_trial: u32,
    ) -> Self {
        Self {
            side,
            opponent,
            fortification,
            defender_resources: ResourceStock::default(),
            total_troops,
            iterations_per_trial,
            unit_pool: None,
        }
    }

    pub fn with_resources(self, defender_resources: ResourceStock) -> Self {
        Self {
            defender_resources,
            ..self
        }
    }

    pub fn with_unit_pool(self, unit_pool: Vec<UnitTypeId>) -> Self {
        Self {
            unit_pool: Some(unit_pool),
            ..self
        }
    }

    /// The battle a candidate is evaluated in.
    pub fn setup_for(&self, candidate: &Composition) -> BattleSetup {
        let (attacker, defender) = match self.side {
            OptimizationSide::Attacker => (candidate.clone(), self.opponent.clone()),
            OptimizationSide::Defender => (self.opponent.clone(), candidate.clone()),
        };
        BattleSetup::new(attacker, defender, self.fortification)
            .with_resources(self.defender_resources.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    #[serde(flatten)]
    pub candidates: CandidateStrategy,
    /// Re-simulate this many top candidates before picking the best; 0 disables.
    pub confirm_top: usize,
    pub confirmation_iterations: u32,
    /// Rows kept in [OptimizationResult::ranking].
    pub ranking_size: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            candidates: CandidateStrategy::default(),
            confirm_top: 0,
            confirmation_iterations: 1000,
            ranking_size: 10,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> EngineResult<()> {
        self.candidates.validate()?;
        if self.confirm_top > 0 && self.confirmation_iterations == 0 {
            return Err(EngineError::invalid_input(
                "optimizer.confirmation_iterations must be >= 1 when confirm_top is set",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub side: OptimizationSide,
    pub best_composition: Composition,
    pub win_rate: f64,
    /// The simulation that produced `win_rate`.
    pub summary: SimulationSummary,
    pub candidates_evaluated: usize,
    /// Whether the top candidates were re-simulated before choosing.
    pub confirmed: bool,
    pub ranking: Vec<RankedCandidate>,
}

#[derive(Debug, Clone)]
pub struct Optimizer {
    simulator: Simulator,
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(simulator: Simulator, config: OptimizerConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { simulator, config })
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn optimize<R>(
        &self,
        request: &OptimizationRequest,
        rng: &mut R,
    ) -> EngineResult<OptimizationResult>
    where
        R: RandomSource + Send,
    {
        self.optimize_with_progress(request, rng, |_, _| {})
    }

    /// Like [Optimizer::optimize] but evaluates candidates in batches and invokes
    /// `on_progress(done, total)` after each one.
    #[instrument(skip_all, fields(side = ?request.side, total_troops = request.total_troops))]
    pub fn optimize_with_progress<R, F>(
        &self,
        request: &OptimizationRequest,
        rng: &mut R,
        mut on_progress: F,
    ) -> EngineResult<OptimizationResult>
    where
        R: RandomSource + Send,
        F: FnMut(u32, u32),
    {
        let pool = self.unit_pool(request)?;

        let generator = CompositionGenerator::with_strategy(self.config.candidates.clone());
        let candidates = generator.generate(&pool, request.total_troops, rng)?;
        let total = candidates.len();
        info!(
            candidates = total,
            method = ?generator.method(pool.len(), request.total_troops),
            "evaluating candidates"
        );

        // Streams are forked in generation order, before any batch runs.
        let mut work = candidates
            .into_iter()
            .enumerate()
            .map(|(index, composition)| (index, composition, rng.fork()))
            .collect::<Vec<_>>()
            .into_iter();

        on_progress(0, total as u32);
        let mut evaluations = Vec::with_capacity(total);
        for (start, end) in batch_ranges(total, OPTIMIZE_PROGRESS_BATCH_COUNT.min(total)) {
            let batch: Vec<_> = work.by_ref().take(end - start).collect();
            evaluations.extend(self.evaluate_candidates(
                request,
                batch,
                request.iterations_per_trial,
            )?);
            debug!(done = end, total, "candidate batch evaluated");
            on_progress(end as u32, total as u32);
        }

        let mut ranked = rank_results(evaluations, request.side);
        let confirmed = self.config.confirm_top > 0;
        if confirmed {
            ranked = tiered::confirm_top(self, request, ranked, rng)?;
        }

        let best = ranked
            .first()
            .cloned()
            .ok_or_else(|| EngineError::invalid_input("no candidate compositions generated"))?;
        let win_rate = request.side.win_rate(&best.summary);
        info!(
            win_rate,
            candidate = best.candidate_index,
            "optimization finished"
        );

        Ok(OptimizationResult {
            side: request.side,
            ranking: ranked_view(&ranked, request.side, self.config.ranking_size),
            best_composition: best.composition,
            win_rate,
            summary: best.summary,
            candidates_evaluated: total,
            confirmed,
        })
    }

    /// Simulate candidates in parallel, each on its own stream. Results keep
    /// the input order.
    pub(crate) fn evaluate_candidates<R>(
        &self,
        request: &OptimizationRequest,
        batch: Vec<(usize, Composition, R)>,
        iterations: u32,
    ) -> EngineResult<Vec<CandidateEvaluation>>
    where
        R: RandomSource + Send,
    {
        self.simulator.pool().install(|| {
            batch
                .into_par_iter()
                .map(|(candidate_index, composition, mut stream)| -> EngineResult<_> {
                    let setup = request.setup_for(&composition);
                    let summary = self.simulator.evaluate(
                        &setup,
                        iterations,
                        &mut stream,
                        Execution::Parallel,
                    )?;
                    Ok(CandidateEvaluation {
                        candidate_index,
                        composition,
                        summary,
                    })
                })
                .collect()
        })
    }

    /// Validate the request and resolve the unit pool before any randomness
    /// is drawn.
    fn unit_pool(&self, request: &OptimizationRequest) -> EngineResult<Vec<UnitTypeId>> {
        if request.total_troops == 0 {
            return Err(EngineError::invalid_input("total_troops must be >= 1"));
        }
        if request.iterations_per_trial == 0 {
            return Err(EngineError::invalid_input("iterations_per_trial must be >= 1"));
        }
        let catalog = self.simulator.catalog();
        if catalog.is_empty() {
            return Err(EngineError::invalid_input("unit catalog is empty"));
        }
        request.fortification.validate()?;
        catalog.resolve(&request.opponent)?;

        let pool: Vec<UnitTypeId> = match &request.unit_pool {
            Some(ids) => ids.clone(),
            None => catalog.ids().cloned().collect(),
        };
        if pool.is_empty() {
            return Err(EngineError::invalid_input("unit pool is empty"));
        }
        let mut seen = HashSet::with_capacity(pool.len());
        for id in &pool {
            catalog.require(id)?;
            if !seen.insert(id) {
                return Err(EngineError::invalid_input(format!(
                    "unit type '{id}' appears more than once in unit pool"
                )));
            }
        }
        Ok(pool)
    }
}

/// Search an attacking army of exactly `total_troops` against `defender`,
/// using default simulation and optimizer settings on the global pool.
pub fn optimize<R>(
    defender: &Composition,
    fortification: FortificationSnapshot,
    catalog: &UnitCatalog,
    total_troops: u32,
    iterations_per_trial: u32,
    rng: &mut R,
) -> EngineResult<OptimizationResult>
where
    R: RandomSource + Send,
{
    let simulator = Simulator::new(
        Arc::new(catalog.clone()),
        SimulationConfig::default(),
        WorkerPool::default(),
    )?;
    let optimizer = Optimizer::new(simulator, OptimizerConfig::default())?;
    let request = OptimizationRequest::new(
        OptimizationSide::Attacker,
        defender.clone(),
        fortification,
        total_troops,
        iterations_per_trial,
    );
    optimizer.optimize(&request, rng)
}
