//! Battle power model: turns a composition into scalar attack and defense power.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::composition::Composition;
use crate::data::unit::{UnitCatalog, UnitClass};
use crate::error::EngineResult;

/// Base (unrandomized) power figures of one army.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PowerProfile {
    /// Attack contributed by every non-cavalry unit.
    pub infantry_attack: f64,
    pub cavalry_attack: f64,
    pub defense_infantry: f64,
    pub defense_cavalry: f64,
    pub total_units: u64,
}

impl PowerProfile {
    /// Resolve a composition once. Unknown unit types fail here, before any
    /// randomness is consumed.
    pub fn resolve(composition: &Composition, catalog: &UnitCatalog) -> EngineResult<Self> {
        let mut profile = Self::default();
        for (_, stats, count) in catalog.resolve(composition)? {
            let count_f = f64::from(count);
            let attack = count_f * f64::from(stats.attack);
            match stats.class {
                UnitClass::Cavalry => profile.cavalry_attack += attack,
                _ => profile.infantry_attack += attack,
            }
            profile.defense_infantry += count_f * f64::from(stats.defense_infantry);
            profile.defense_cavalry += count_f * f64::from(stats.defense_cavalry);
            profile.total_units += u64::from(count);
        }
        Ok(profile)
    }

    pub fn attack(&self) -> f64 {
        self.infantry_attack + self.cavalry_attack
    }

    /// Share of the attack coming from cavalry, 0 when there is no attack.
    pub fn cavalry_share(&self) -> f64 {
        let attack = self.attack();
        if attack > 0.0 {
            self.cavalry_attack / attack
        } else {
            0.0
        }
    }
}

/// Chooses how a defender's infantry and cavalry defense combine against a
/// given attacker.
pub trait DefenseSelectionPolicy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn defense_power(&self, defender: &PowerProfile, attacker: &PowerProfile) -> f64;
}

/// Default policy: both defense stats are summed regardless of who attacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombinedDefense;

impl DefenseSelectionPolicy for CombinedDefense {
    fn name(&self) -> &'static str {
        "combined"
    }

    fn defense_power(&self, defender: &PowerProfile, _attacker: &PowerProfile) -> f64 {
        defender.defense_infantry + defender.defense_cavalry
    }
}

/// Weights defense vs infantry and defense vs cavalry by the attacker's
/// infantry/cavalry attack shares.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassWeightedDefense;

impl DefenseSelectionPolicy for ClassWeightedDefense {
    fn name(&self) -> &'static str {
        "class_weighted"
    }

    fn defense_power(&self, defender: &PowerProfile, attacker: &PowerProfile) -> f64 {
        let cavalry_share = if attacker.attack() > 0.0 {
            attacker.cavalry_share()
        } else {
            0.5
        };
        defender.defense_infantry * (1.0 - cavalry_share) + defender.defense_cavalry * cavalry_share
    }
}

/// Which [DefenseSelectionPolicy] the simulator uses, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefensePolicyKind {
    #[default]
    Combined,
    ClassWeighted,
}

impl DefensePolicyKind {
    pub fn policy(self) -> Box<dyn DefenseSelectionPolicy> {
        match self {
            Self::Combined => Box::new(CombinedDefense),
            Self::ClassWeighted => Box::new(ClassWeightedDefense),
        }
    }
}

/// `(Σ count·attack, Σ count·(defense_infantry + defense_cavalry))` for one composition.
pub fn compute_power(composition: &Composition, catalog: &UnitCatalog) -> EngineResult<(f64, f64)> {
    let profile = PowerProfile::resolve(composition, catalog)?;
    let defense = CombinedDefense.defense_power(&profile, &PowerProfile::default());
    Ok((profile.attack(), defense))
}
