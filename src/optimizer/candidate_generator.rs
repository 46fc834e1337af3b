//! Candidate compositions for the optimizer.
//!
//! Every candidate splits exactly `total_troops` across the unit pool. Small
//! search spaces are enumerated exhaustively; larger ones use a coarse grid of
//! slots scaled up to the budget, and when even a one-slot grid is too big we
//! fall back to random partitions drawn from the caller's random source.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::combat::rng::RandomSource;
use crate::data::composition::{Composition, TroopEntry};
use crate::data::unit::UnitTypeId;
use crate::error::{EngineError, EngineResult};

/// Random partitions are drawn up to this many times `max_candidates` before
/// giving up on finding more distinct ones.
const RANDOM_ATTEMPTS_PER_CANDIDATE: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateStrategy {
    /// Enumerate every partition when there are at most this many.
    pub exhaustive_candidate_limit: usize,
    /// Upper bound on grid and random candidates.
    pub max_candidates: usize,
    /// Shuffle the generated order with a seed drawn from the random source.
    pub use_seeded_shuffle: bool,
}

impl Default for CandidateStrategy {
    fn default() -> Self {
        Self {
            exhaustive_candidate_limit: 256,
            max_candidates: 256,
            use_seeded_shuffle: false,
        }
    }
}

impl CandidateStrategy {
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_candidates == 0 {
            return Err(EngineError::invalid_input(
                "optimizer.candidates.max_candidates must be >= 1",
            ));
        }
        Ok(())
    }
}

/// How a candidate list is built for a given pool size and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMethod {
    Exhaustive,
    /// Partitions of `slots` grid units, scaled to the troop budget.
    Grid { slots: u32 },
    Random,
}

#[derive(Debug, Clone, Default)]
pub struct CompositionGenerator {
    strategy: CandidateStrategy,
}

impl CompositionGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(strategy: CandidateStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &CandidateStrategy {
        &self.strategy
    }

    pub fn method(&self, unit_types: usize, total_troops: u32) -> GenerationMethod {
        let parts = unit_types.max(1);
        if partition_count(total_troops, parts) <= self.strategy.exhaustive_candidate_limit as u128 {
            return GenerationMethod::Exhaustive;
        }
        let max = self.strategy.max_candidates as u128;
        if partition_count(1, parts) > max {
            return GenerationMethod::Random;
        }
        let mut slots = 1;
        while slots < total_troops && partition_count(slots + 1, parts) <= max {
            slots += 1;
        }
        GenerationMethod::Grid { slots }
    }

    /// Generate distinct candidates, each summing to `total_troops`, in a
    /// deterministic order for a given random source state. Zero-count
    /// entries are omitted from the returned compositions.
    pub fn generate<R: RandomSource>(
        &self,
        units: &[UnitTypeId],
        total_troops: u32,
        rng: &mut R,
    ) -> EngineResult<Vec<Composition>> {
        if units.is_empty() {
            return Err(EngineError::invalid_input("unit pool is empty"));
        }
        if total_troops == 0 {
            return Err(EngineError::invalid_input("total_troops must be >= 1"));
        }
        self.strategy.validate()?;

        let raw = match self.method(units.len(), total_troops) {
            GenerationMethod::Exhaustive => weak_compositions(total_troops, units.len()),
            GenerationMethod::Grid { slots } => weak_compositions(slots, units.len())
                .into_iter()
                .map(|grid| apportion(&grid, slots, total_troops))
                .collect(),
            GenerationMethod::Random => random_partitions(
                total_troops,
                units.len(),
                self.strategy.max_candidates,
                rng,
            ),
        };

        let mut seen = HashSet::with_capacity(raw.len());
        let mut counts: Vec<Vec<u32>> = raw
            .into_iter()
            .filter(|candidate| seen.insert(candidate.clone()))
            .collect();
        if self.strategy.use_seeded_shuffle {
            deterministic_shuffle(&mut counts, rng.next_u64());
        }

        counts
            .into_iter()
            .map(|candidate| {
                let entries = units
                    .iter()
                    .zip(candidate)
                    .filter(|(_, count)| *count > 0)
                    .map(|(id, count)| TroopEntry::new(id.clone(), count))
                    .collect();
                Composition::new(entries)
            })
            .collect()
    }
}

/// `C(total + parts - 1, parts - 1)`, saturating at `u128::MAX`.
pub fn partition_count(total: u32, parts: usize) -> u128 {
    let mut count: u128 = 1;
    for i in 1..parts as u128 {
        match count.checked_mul(u128::from(total) + i) {
            Some(product) => count = product / i,
            None => return u128::MAX,
        }
    }
    count
}

/// Every way to split `total` into `parts` ordered non-negative counts,
/// largest share for the first unit first.
fn weak_compositions(total: u32, parts: usize) -> Vec<Vec<u32>> {
    fn fill(remaining: u32, parts: usize, current: &mut Vec<u32>, out: &mut Vec<Vec<u32>>) {
        if parts == 1 {
            current.push(remaining);
            out.push(current.clone());
            current.pop();
            return;
        }
        for take in (0..=remaining).rev() {
            current.push(take);
            fill(remaining - take, parts - 1, current, out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    fill(total, parts, &mut Vec::with_capacity(parts), &mut out);
    out
}

/// Scale a grid point to the troop budget by largest remainder. Ties go to
/// the earlier unit.
fn apportion(grid: &[u32], slots: u32, total: u32) -> Vec<u32> {
    let exact: Vec<(u64, u64)> = grid
        .iter()
        .map(|share| {
            let scaled = u64::from(*share) * u64::from(total);
            (scaled / u64::from(slots), scaled % u64::from(slots))
        })
        .collect();
    let mut counts: Vec<u32> = exact.iter().map(|(whole, _)| *whole as u32).collect();
    let assigned: u64 = exact.iter().map(|(whole, _)| whole).sum();
    let mut leftover = u64::from(total) - assigned;

    let mut order: Vec<usize> = (0..grid.len()).collect();
    order.sort_by(|a, b| exact[*b].1.cmp(&exact[*a].1).then(a.cmp(b)));
    for index in order {
        if leftover == 0 {
            break;
        }
        counts[index] += 1;
        leftover -= 1;
    }
    counts
}

fn random_partitions<R: RandomSource>(
    total: u32,
    parts: usize,
    wanted: usize,
    rng: &mut R,
) -> Vec<Vec<u32>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(wanted);
    for _ in 0..wanted.saturating_mul(RANDOM_ATTEMPTS_PER_CANDIDATE) {
        if out.len() == wanted {
            break;
        }
        let mut cuts: Vec<u32> = (1..parts)
            .map(|_| ((rng.next_f64() * (f64::from(total) + 1.0)) as u32).min(total))
            .collect();
        cuts.sort_unstable();
        let mut previous = 0;
        let mut candidate = Vec::with_capacity(parts);
        for cut in cuts {
            candidate.push(cut - previous);
            previous = cut;
        }
        candidate.push(total - previous);
        if seen.insert(candidate.clone()) {
            out.push(candidate);
        }
    }
    out
}

fn deterministic_shuffle<T>(items: &mut [T], seed: u64) {
    if items.len() < 2 {
        return;
    }

    let mut state = seed;
    for index in (1..items.len()).rev() {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let swap_index = (state as usize) % (index + 1);
        items.swap(index, swap_index);
    }
}
