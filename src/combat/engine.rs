//! Single-trial battle resolution: randomized power, outcome rule, casualties
//! and loot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::defense::FortificationSnapshot;
use crate::combat::power::{DefensePolicyKind, DefenseSelectionPolicy, PowerProfile};
use crate::combat::rng::RandomSource;
use crate::data::composition::Composition;
use crate::data::resources::{ResourceKind, ResourceStock};
use crate::data::unit::{UnitCatalog, UnitStats, UnitTypeId};
use crate::error::{EngineError, EngineResult};

/// A side wins only when its power exceeds the other's by strictly more than this ratio.
pub const DECISIVE_RATIO: f64 = 1.1;

/// Above this many units involved the casualty exponent starts shrinking.
const IMMENSITY_THRESHOLD: u64 = 1000;
const IMMENSITY_MIN_EXPONENT: f64 = 1.2578;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    AttackerWins,
    DefenderWins,
    Draw,
}

/// Classify a trial by power ratio. Comparisons are strict: a side sitting
/// exactly on the 1.1 boundary does not win.
pub fn classify_outcome(attacker_power: f64, defender_power: f64) -> Outcome {
    if attacker_power > defender_power * DECISIVE_RATIO {
        Outcome::AttackerWins
    } else if defender_power > attacker_power * DECISIVE_RATIO {
        Outcome::DefenderWins
    } else {
        Outcome::Draw
    }
}

/// Per-side uniform power factor range `[low, high)`. `low == high` disables
/// randomization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerVariance {
    pub low: f64,
    pub high: f64,
}

impl Default for PowerVariance {
    fn default() -> Self {
        Self {
            low: 0.8,
            high: 1.2,
        }
    }
}

impl PowerVariance {
    pub const fn fixed(factor: f64) -> Self {
        Self {
            low: factor,
            high: factor,
        }
    }

    pub fn sample<R: RandomSource>(&self, rng: &mut R) -> f64 {
        rng.uniform(self.low, self.high)
    }
}

/// Casualty model: `lf = (weaker / stronger)^m`; the stronger side loses
/// `lf / (1 + lf)` of its troops, the weaker side `1 / (1 + lf)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasualtyModel {
    pub exponent: f64,
    /// Shrink the exponent for very large battles.
    pub scale_with_immensity: bool,
}

impl Default for CasualtyModel {
    fn default() -> Self {
        Self {
            exponent: 1.5,
            scale_with_immensity: true,
        }
    }
}

impl CasualtyModel {
    pub fn exponent_for(&self, total_units: u64) -> f64 {
        if !self.scale_with_immensity || total_units < IMMENSITY_THRESHOLD {
            return self.exponent;
        }
        let scaled = 2.0 * (1.8592 - (total_units as f64).powf(0.015));
        scaled.clamp(IMMENSITY_MIN_EXPONENT.min(self.exponent), self.exponent)
    }

    /// Fractions of troops lost by `(attacker, defender)`.
    pub fn loss_fractions(
        &self,
        attacker_power: f64,
        defender_power: f64,
        total_units: u64,
    ) -> (f64, f64) {
        if attacker_power <= 0.0 && defender_power <= 0.0 {
            return (0.0, 0.0);
        }
        let exponent = self.exponent_for(total_units);
        if attacker_power >= defender_power {
            let lf = (defender_power / attacker_power).powf(exponent);
            (lf / (1.0 + lf), 1.0 / (1.0 + lf))
        } else {
            let lf = (attacker_power / defender_power).powf(exponent);
            (1.0 / (1.0 + lf), lf / (1.0 + lf))
        }
    }
}

/// Rules applied to every trial of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub variance: PowerVariance,
    /// Fraction of each stored resource carried off on an attacker win.
    pub loot_fraction: f64,
    pub casualties: CasualtyModel,
    /// Trials per parallel batch. Batch boundaries depend only on this and the
    /// iteration count, so seeded output does not depend on the thread count.
    pub trials_per_batch: u32,
    pub defense_policy: DefensePolicyKind,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            variance: PowerVariance::default(),
            loot_fraction: 0.5,
            casualties: CasualtyModel::default(),
            trials_per_batch: 256,
            defense_policy: DefensePolicyKind::Combined,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let PowerVariance { low, high } = self.variance;
        if !low.is_finite() || !high.is_finite() || low < 0.0 || high < low {
            return Err(EngineError::invalid_input(format!(
                "simulation.variance must satisfy 0 <= low <= high, got [{low}, {high})"
            )));
        }
        if !(0.0..=1.0).contains(&self.loot_fraction) {
            return Err(EngineError::invalid_input(format!(
                "simulation.loot_fraction must be within [0, 1], got {}",
                self.loot_fraction
            )));
        }
        if !self.casualties.exponent.is_finite() || self.casualties.exponent <= 0.0 {
            return Err(EngineError::invalid_input(format!(
                "simulation.casualties.exponent must be > 0, got {}",
                self.casualties.exponent
            )));
        }
        if self.trials_per_batch == 0 {
            return Err(EngineError::invalid_input(
                "simulation.trials_per_batch must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Everything the caller supplies about one battle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleSetup {
    pub attacker: Composition,
    pub defender: Composition,
    #[serde(default)]
    pub fortification: FortificationSnapshot,
    /// Resources stored by the defender, the loot pool.
    #[serde(default)]
    pub defender_resources: ResourceStock,
}

impl BattleSetup {
    pub fn new(
        attacker: Composition,
        defender: Composition,
        fortification: FortificationSnapshot,
    ) -> Self {
        Self {
            attacker,
            defender,
            fortification,
            defender_resources: ResourceStock::default(),
        }
    }

    pub fn with_resources(self, defender_resources: ResourceStock) -> Self {
        Self {
            defender_resources,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleTrialResult {
    pub outcome: Outcome,
    pub attacker_power: f64,
    pub defender_power: f64,
    pub attacker_losses: BTreeMap<UnitTypeId, u32>,
    pub defender_losses: BTreeMap<UnitTypeId, u32>,
    pub resources_looted: BTreeMap<ResourceKind, u64>,
}

impl BattleTrialResult {
    /// A trial in which nothing could fight: a draw at zero power.
    pub fn idle() -> Self {
        Self {
            outcome: Outcome::Draw,
            attacker_power: 0.0,
            defender_power: 0.0,
            attacker_losses: BTreeMap::new(),
            defender_losses: BTreeMap::new(),
            resources_looted: BTreeMap::new(),
        }
    }
}

type ResolvedArmy<'a> = Vec<(&'a UnitTypeId, &'a UnitStats, u32)>;

/// A battle resolved against the catalog once, then shared read-only by every trial.
#[derive(Debug)]
pub struct ResolvedBattle<'a> {
    attacker: ResolvedArmy<'a>,
    defender: ResolvedArmy<'a>,
    attacker_profile: PowerProfile,
    defender_profile: PowerProfile,
    /// Defender power before randomization and the defensive multiplier.
    base_defense: f64,
    fortification: FortificationSnapshot,
    loot_pool: &'a ResourceStock,
}

impl<'a> ResolvedBattle<'a> {
    pub fn new(
        setup: &'a BattleSetup,
        catalog: &'a UnitCatalog,
        policy: &dyn DefenseSelectionPolicy,
    ) -> EngineResult<Self> {
        setup.fortification.validate()?;
        let attacker = catalog.resolve(&setup.attacker)?;
        let defender = catalog.resolve(&setup.defender)?;
        let attacker_profile = PowerProfile::resolve(&setup.attacker, catalog)?;
        let defender_profile = PowerProfile::resolve(&setup.defender, catalog)?;
        // Walls without a garrison do not fight.
        let base_defense = if defender_profile.total_units == 0 {
            0.0
        } else {
            policy.defense_power(&defender_profile, &attacker_profile)
                + setup.fortification.flat_defense
        };
        Ok(Self {
            attacker,
            defender,
            attacker_profile,
            defender_profile,
            base_defense,
            fortification: setup.fortification,
            loot_pool: &setup.defender_resources,
        })
    }

    pub fn attacker_profile(&self) -> &PowerProfile {
        &self.attacker_profile
    }

    pub fn defender_profile(&self) -> &PowerProfile {
        &self.defender_profile
    }

    pub fn fortification(&self) -> &FortificationSnapshot {
        &self.fortification
    }

    /// Both armies are empty: there is nothing to fight.
    pub fn is_trivial(&self) -> bool {
        self.attacker_profile.total_units == 0 && self.defender_profile.total_units == 0
    }

    /// The attacker brought troops and nobody holds the village.
    pub fn is_undefended(&self) -> bool {
        self.attacker_profile.total_units > 0 && self.defender_profile.total_units == 0
    }

    pub fn attacker_units(&self) -> impl Iterator<Item = (&'a UnitTypeId, u32)> + '_ {
        self.attacker.iter().map(|(id, _, count)| (*id, *count))
    }

    pub fn defender_units(&self) -> impl Iterator<Item = (&'a UnitTypeId, u32)> + '_ {
        self.defender.iter().map(|(id, _, count)| (*id, *count))
    }

    pub fn loot_kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.loot_pool.iter().map(|(kind, _)| kind)
    }

    /// Run one randomized trial. Both power factors are always drawn, so every
    /// trial consumes the same amount of randomness. An undefended village
    /// always falls to the attacker, whatever the attacker's power.
    pub fn run_trial<R: RandomSource>(
        &self,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> BattleTrialResult {
        let attacker_factor = config.variance.sample(rng);
        let defender_factor = config.variance.sample(rng);
        let attacker_power = self.attacker_profile.attack() * attacker_factor;
        let defender_power =
            self.base_defense * defender_factor * self.fortification.defensive_bonus;

        let outcome = if self.is_undefended() {
            Outcome::AttackerWins
        } else {
            classify_outcome(attacker_power, defender_power)
        };
        let total_units = self.attacker_profile.total_units + self.defender_profile.total_units;
        let (attacker_fraction, defender_fraction) =
            config
                .casualties
                .loss_fractions(attacker_power, defender_power, total_units);

        let attacker_losses = apply_losses(&self.attacker, attacker_fraction);
        let defender_losses = apply_losses(&self.defender, defender_fraction);
        let resources_looted = if outcome == Outcome::AttackerWins {
            self.loot(&attacker_losses, config.loot_fraction)
        } else {
            BTreeMap::new()
        };

        BattleTrialResult {
            outcome,
            attacker_power,
            defender_power,
            attacker_losses,
            defender_losses,
            resources_looted,
        }
    }

    /// Take `loot_fraction` of every stored resource, scaled down to what the
    /// surviving attackers can carry.
    fn loot(
        &self,
        attacker_losses: &BTreeMap<UnitTypeId, u32>,
        loot_fraction: f64,
    ) -> BTreeMap<ResourceKind, u64> {
        let capacity: u64 = self
            .attacker
            .iter()
            .map(|(id, stats, count)| {
                let survivors = count - attacker_losses.get(*id).copied().unwrap_or(0);
                u64::from(survivors) * u64::from(stats.carry_capacity)
            })
            .sum();

        let wanted: Vec<(ResourceKind, u64)> = self
            .loot_pool
            .iter()
            .map(|(kind, stored)| (kind, (stored as f64 * loot_fraction).floor() as u64))
            .collect();
        let wanted_total: u64 = wanted.iter().map(|(_, amount)| amount).sum();

        wanted
            .into_iter()
            .map(|(kind, amount)| {
                let taken = if wanted_total <= capacity {
                    amount
                } else {
                    (u128::from(amount) * u128::from(capacity) / u128::from(wanted_total)) as u64
                };
                (kind, taken)
            })
            .filter(|(_, taken)| *taken > 0)
            .collect()
    }
}

/// Apply a loss fraction to every unit type proportionally, never exceeding the
/// entry's count. Unit types without losses are left out.
fn apply_losses(army: &ResolvedArmy<'_>, fraction: f64) -> BTreeMap<UnitTypeId, u32> {
    army.iter()
        .filter(|(_, _, count)| *count > 0)
        .filter_map(|(id, _, count)| {
            let lost = ((f64::from(*count) * fraction).round() as u32).min(*count);
            (lost > 0).then(|| ((*id).clone(), lost))
        })
        .collect()
}
