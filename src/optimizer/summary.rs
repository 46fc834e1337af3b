//! Aggregate statistics over many trials.
//!
//! Each worker folds its trials into a [SummaryAccumulator]; partials are
//! merged in batch order and turned into a [SimulationSummary] at the end.
//! Individual trials are not retained.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::engine::{BattleTrialResult, Outcome, ResolvedBattle};
use crate::data::resources::ResourceKind;
use crate::data::unit::UnitTypeId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerStats {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub iterations: u32,
    pub attacker_wins: u32,
    pub defender_wins: u32,
    pub draws: u32,
    pub attacker_win_rate: f64,
    pub defender_win_rate: f64,
    pub draw_rate: f64,
    pub attacker_power: PowerStats,
    pub defender_power: PowerStats,
    /// Average units lost per trial, by unit type.
    pub attacker_avg_losses: BTreeMap<UnitTypeId, f64>,
    pub defender_avg_losses: BTreeMap<UnitTypeId, f64>,
    /// Average fraction of the side's troops lost per trial.
    pub attacker_loss_ratio: f64,
    pub defender_loss_ratio: f64,
    /// Average loot per trial (non-winning trials count as zero).
    pub avg_resources_looted: BTreeMap<ResourceKind, f64>,
    pub defensive_bonus: f64,
    pub spy_defense: f64,
    /// Share of the attacker's base attack coming from cavalry.
    pub attacker_cavalry_share: f64,
    pub defense_policy: String,
}

impl SimulationSummary {
    pub fn wins_for(&self, outcome: Outcome) -> u32 {
        match outcome {
            Outcome::AttackerWins => self.attacker_wins,
            Outcome::DefenderWins => self.defender_wins,
            Outcome::Draw => self.draws,
        }
    }

    pub fn avg_loot_total(&self) -> f64 {
        self.avg_resources_looted.values().sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct PowerAccumulator {
    min: f64,
    max: f64,
    sum: f64,
}

impl Default for PowerAccumulator {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
        }
    }
}

impl PowerAccumulator {
    fn record(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
    }

    fn merge(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
    }

    fn finish(&self, trials: u64) -> PowerStats {
        if trials == 0 {
            return PowerStats::default();
        }
        PowerStats {
            min: self.min,
            mean: self.sum / trials as f64,
            max: self.max,
        }
    }
}

/// Running totals for one batch of trials (or all of them, once merged).
#[derive(Debug, Clone)]
pub struct SummaryAccumulator {
    trials: u64,
    attacker_wins: u64,
    defender_wins: u64,
    draws: u64,
    attacker_power: PowerAccumulator,
    defender_power: PowerAccumulator,
    attacker_losses: BTreeMap<UnitTypeId, u64>,
    defender_losses: BTreeMap<UnitTypeId, u64>,
    loot: BTreeMap<ResourceKind, u64>,
}

impl SummaryAccumulator {
    /// Start empty totals keyed by every present unit type and stored resource.
    pub fn new(battle: &ResolvedBattle<'_>) -> Self {
        Self {
            trials: 0,
            attacker_wins: 0,
            defender_wins: 0,
            draws: 0,
            attacker_power: PowerAccumulator::default(),
            defender_power: PowerAccumulator::default(),
            attacker_losses: zeroed_units(battle.attacker_units()),
            defender_losses: zeroed_units(battle.defender_units()),
            loot: battle.loot_kinds().map(|kind| (kind, 0)).collect(),
        }
    }

    pub fn trials(&self) -> u64 {
        self.trials
    }

    pub fn record(&mut self, trial: &BattleTrialResult) {
        self.trials += 1;
        match trial.outcome {
            Outcome::AttackerWins => self.attacker_wins += 1,
            Outcome::DefenderWins => self.defender_wins += 1,
            Outcome::Draw => self.draws += 1,
        }
        self.attacker_power.record(trial.attacker_power);
        self.defender_power.record(trial.defender_power);
        add_counts(&mut self.attacker_losses, &trial.attacker_losses);
        add_counts(&mut self.defender_losses, &trial.defender_losses);
        for (kind, amount) in &trial.resources_looted {
            *self.loot.entry(*kind).or_insert(0) += amount;
        }
    }

    /// Record `count` trials in which nothing could fight: draws at zero power.
    pub fn record_idle(&mut self, count: u32) {
        if count == 0 {
            return;
        }
        self.trials += u64::from(count);
        self.draws += u64::from(count);
        self.attacker_power.record(0.0);
        self.defender_power.record(0.0);
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.trials += other.trials;
        self.attacker_wins += other.attacker_wins;
        self.defender_wins += other.defender_wins;
        self.draws += other.draws;
        self.attacker_power.merge(&other.attacker_power);
        self.defender_power.merge(&other.defender_power);
        for (id, lost) in other.attacker_losses {
            *self.attacker_losses.entry(id).or_insert(0) += lost;
        }
        for (id, lost) in other.defender_losses {
            *self.defender_losses.entry(id).or_insert(0) += lost;
        }
        for (kind, amount) in other.loot {
            *self.loot.entry(kind).or_insert(0) += amount;
        }
        self
    }

    pub fn finish(self, battle: &ResolvedBattle<'_>, defense_policy: &str) -> SimulationSummary {
        let trials = self.trials;
        let rate = |count: u64| {
            if trials == 0 {
                0.0
            } else {
                count as f64 / trials as f64
            }
        };
        let average = |sum: u64| rate(sum);
        let loss_ratio = |losses: &BTreeMap<UnitTypeId, u64>, units: u64| {
            if trials == 0 || units == 0 {
                0.0
            } else {
                losses.values().sum::<u64>() as f64 / (units as f64 * trials as f64)
            }
        };

        SimulationSummary {
            iterations: trials as u32,
            attacker_wins: self.attacker_wins as u32,
            defender_wins: self.defender_wins as u32,
            draws: self.draws as u32,
            attacker_win_rate: rate(self.attacker_wins),
            defender_win_rate: rate(self.defender_wins),
            draw_rate: rate(self.draws),
            attacker_power: self.attacker_power.finish(trials),
            defender_power: self.defender_power.finish(trials),
            attacker_loss_ratio: loss_ratio(
                &self.attacker_losses,
                battle.attacker_profile().total_units,
            ),
            defender_loss_ratio: loss_ratio(
                &self.defender_losses,
                battle.defender_profile().total_units,
            ),
            attacker_avg_losses: self
                .attacker_losses
                .into_iter()
                .map(|(id, sum)| (id, average(sum)))
                .collect(),
            defender_avg_losses: self
                .defender_losses
                .into_iter()
                .map(|(id, sum)| (id, average(sum)))
                .collect(),
            avg_resources_looted: self
                .loot
                .into_iter()
                .map(|(kind, sum)| (kind, average(sum)))
                .collect(),
            defensive_bonus: battle.fortification().defensive_bonus,
            spy_defense: battle.fortification().spy_defense,
            attacker_cavalry_share: battle.attacker_profile().cavalry_share(),
            defense_policy: defense_policy.to_string(),
        }
    }
}

fn zeroed_units<'a>(
    units: impl Iterator<Item = (&'a UnitTypeId, u32)>,
) -> BTreeMap<UnitTypeId, u64> {
    units
        .filter(|(_, count)| *count > 0)
        .map(|(id, _)| (id.clone(), 0))
        .collect()
}

fn add_counts(totals: &mut BTreeMap<UnitTypeId, u64>, losses: &BTreeMap<UnitTypeId, u32>) {
    for (id, lost) in losses {
        match totals.get_mut(id) {
            Some(total) => *total += u64::from(*lost),
            None => {
                totals.insert(id.clone(), u64::from(*lost));
            }
        }
    }
}
