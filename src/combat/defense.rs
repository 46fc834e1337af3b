//! Defense calculator: folds wall, residence, garrison buildings and active
//! effects into a single defensive multiplier, a flat defense contribution and
//! a spy-defense percentage.
//!
//! Levels are signed so that a negative level coming from the caller can be
//! rejected instead of silently treated as zero. Only the derived spy-defense
//! percentage is clamped.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Tunable constants for the defense calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseConfig {
    /// Multiplier per wall level (compounded).
    pub wall_factor: f64,
    /// Flat defense = this × residence_level².
    pub residence_bonus_per_level_sq: f64,
    /// Defensive bonus percentage per garrison building level.
    pub garrison_bonus_pct_per_level: f64,
    /// Spy-defense percentage per watchtower level.
    pub spy_defense_pct_per_watchtower_level: f64,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            wall_factor: 1.03,
            residence_bonus_per_level_sq: 2.0,
            garrison_bonus_pct_per_level: 1.0,
            spy_defense_pct_per_watchtower_level: 5.0,
        }
    }
}

impl DefenseConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.wall_factor.is_finite() || self.wall_factor < 1.0 {
            return Err(EngineError::invalid_input(format!(
                "defense.wall_factor must be >= 1.0, got {}",
                self.wall_factor
            )));
        }
        for (name, value) in [
            (
                "defense.residence_bonus_per_level_sq",
                self.residence_bonus_per_level_sq,
            ),
            (
                "defense.garrison_bonus_pct_per_level",
                self.garrison_bonus_pct_per_level,
            ),
            (
                "defense.spy_defense_pct_per_watchtower_level",
                self.spy_defense_pct_per_watchtower_level,
            ),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::invalid_input(format!(
                    "{name} must be >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Raw fortification state of a defending village, as resolved by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FortificationInputs {
    pub wall_level: i32,
    pub residence_level: i32,
    /// Levels of buildings that add a percentage defensive bonus.
    pub garrison_levels: Vec<i32>,
    pub watchtower_level: i32,
    /// Active artifact / effect bonus, in percent.
    pub effect_bonus_pct: f64,
    /// Spy defense the village has before buildings and effects, in percent.
    pub base_spy_defense_pct: f64,
}

/// Defender-side fortification state consumed by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FortificationSnapshot {
    /// Multiplicative factor applied to the defender's randomized power.
    pub defensive_bonus: f64,
    /// Flat defense added to the defender's power before the multiplier.
    #[serde(default)]
    pub flat_defense: f64,
    /// Spy defense in percent, always within [0, 100].
    #[serde(default)]
    pub spy_defense: f64,
}

impl Default for FortificationSnapshot {
    fn default() -> Self {
        Self::neutral()
    }
}

impl FortificationSnapshot {
    /// Build a snapshot directly. The bonus and flat defense must be finite and
    /// non-negative; spy defense is a derived percentage and gets clamped.
    pub fn new(defensive_bonus: f64, flat_defense: f64, spy_defense: f64) -> EngineResult<Self> {
        if !defensive_bonus.is_finite() || defensive_bonus < 0.0 {
            return Err(EngineError::invalid_fortification(format!(
                "defensive bonus must be a finite value >= 0, got {defensive_bonus}"
            )));
        }
        if !flat_defense.is_finite() || flat_defense < 0.0 {
            return Err(EngineError::invalid_fortification(format!(
                "flat defense must be a finite value >= 0, got {flat_defense}"
            )));
        }
        if spy_defense.is_nan() {
            return Err(EngineError::invalid_fortification("spy defense is NaN"));
        }
        Ok(Self {
            defensive_bonus,
            flat_defense,
            spy_defense: spy_defense.clamp(0.0, 100.0),
        })
    }

    /// No fortification at all: bonus 1.0, no flat defense, no spy defense.
    pub const fn neutral() -> Self {
        Self {
            defensive_bonus: 1.0,
            flat_defense: 0.0,
            spy_defense: 0.0,
        }
    }

    /// Chance in [0, 1] that enemy scouting is detected.
    pub fn espionage_resistance(&self) -> f64 {
        self.spy_defense / 100.0
    }

    /// Re-check a snapshot that did not come through [FortificationSnapshot::new]
    /// (e.g. deserialized).
    pub fn validate(&self) -> EngineResult<()> {
        if !(0.0..=100.0).contains(&self.spy_defense) {
            return Err(EngineError::invalid_fortification(format!(
                "spy defense must be within [0, 100], got {}",
                self.spy_defense
            )));
        }
        Self::new(self.defensive_bonus, self.flat_defense, self.spy_defense).map(|_| ())
    }
}

fn require_level(name: &str, level: i32) -> EngineResult<u32> {
    u32::try_from(level).map_err(|_| {
        EngineError::invalid_fortification(format!("{name} must be >= 0, got {level}"))
    })
}

fn require_pct(name: &str, value: f64) -> EngineResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(EngineError::invalid_fortification(format!(
            "{name} must be a finite percentage >= 0, got {value}"
        )));
    }
    Ok(value)
}

/// Fold raw fortification inputs into a [FortificationSnapshot].
pub fn compute_defense(
    inputs: &FortificationInputs,
    config: &DefenseConfig,
) -> EngineResult<FortificationSnapshot> {
    let wall = require_level("wall level", inputs.wall_level)?;
    let residence = require_level("residence level", inputs.residence_level)?;
    let watchtower = require_level("watchtower level", inputs.watchtower_level)?;
    let mut garrison_total = 0u64;
    for (index, level) in inputs.garrison_levels.iter().enumerate() {
        garrison_total += u64::from(require_level(&format!("garrison level [{index}]"), *level)?);
    }
    let effect_pct = require_pct("effect bonus", inputs.effect_bonus_pct)?;
    let base_spy_pct = require_pct("base spy defense", inputs.base_spy_defense_pct)?;

    let wall_multiplier = config.wall_factor.powf(f64::from(wall));
    let garrison_multiplier = 1.0 + garrison_total as f64 * config.garrison_bonus_pct_per_level / 100.0;
    let effect_multiplier = 1.0 + effect_pct / 100.0;
    let defensive_bonus = wall_multiplier * garrison_multiplier * effect_multiplier;

    let flat_defense = config.residence_bonus_per_level_sq * f64::from(residence).powi(2);

    let spy_defense = (base_spy_pct
        + f64::from(watchtower) * config.spy_defense_pct_per_watchtower_level
        + effect_pct)
        .clamp(0.0, 100.0);

    FortificationSnapshot::new(defensive_bonus, flat_defense, spy_defense)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
    }

    #[test]
    fn no_fortification_is_neutral() {
        let snapshot =
            compute_defense(&FortificationInputs::default(), &DefenseConfig::default()).expect("ok");
        assert_eq!(snapshot, FortificationSnapshot::neutral());
    }

    #[test]
    fn wall_compounds_per_level() {
        let inputs = FortificationInputs {
            wall_level: 10,
            ..FortificationInputs::default()
        };
        let snapshot = compute_defense(&inputs, &DefenseConfig::default()).expect("ok");
        approx_eq(snapshot.defensive_bonus, 1.03f64.powi(10));
        assert!(snapshot.defensive_bonus >= 1.0);
    }

    #[test]
    fn garrison_and_effects_multiply_on_top_of_wall() {
        let inputs = FortificationInputs {
            wall_level: 1,
            garrison_levels: vec![5, 5],
            effect_bonus_pct: 20.0,
            ..FortificationInputs::default()
        };
        let snapshot = compute_defense(&inputs, &DefenseConfig::default()).expect("ok");
        approx_eq(snapshot.defensive_bonus, 1.03 * 1.10 * 1.20);
    }

    #[test]
    fn residence_adds_flat_defense() {
        let inputs = FortificationInputs {
            residence_level: 10,
            ..FortificationInputs::default()
        };
        let snapshot = compute_defense(&inputs, &DefenseConfig::default()).expect("ok");
        approx_eq(snapshot.flat_defense, 200.0);
        approx_eq(snapshot.defensive_bonus, 1.0);
    }

    #[test]
    fn spy_defense_is_clamped_to_percentage_range() {
        let inputs = FortificationInputs {
            watchtower_level: 20,
            base_spy_defense_pct: 30.0,
            ..FortificationInputs::default()
        };
        let snapshot = compute_defense(&inputs, &DefenseConfig::default()).expect("ok");
        approx_eq(snapshot.spy_defense, 100.0);
        approx_eq(snapshot.espionage_resistance(), 1.0);
    }

    #[test]
    fn negative_levels_are_rejected_not_clamped() {
        for inputs in [
            FortificationInputs {
                wall_level: -1,
                ..FortificationInputs::default()
            },
            FortificationInputs {
                residence_level: -3,
                ..FortificationInputs::default()
            },
            FortificationInputs {
                garrison_levels: vec![2, -1],
                ..FortificationInputs::default()
            },
            FortificationInputs {
                watchtower_level: -2,
                ..FortificationInputs::default()
            },
        ] {
            let err = compute_defense(&inputs, &DefenseConfig::default()).expect_err("negative");
            assert!(matches!(err, EngineError::InvalidFortification(_)), "{err}");
        }
    }

    #[test]
    fn negative_bonus_percentages_are_rejected() {
        let inputs = FortificationInputs {
            effect_bonus_pct: -5.0,
            ..FortificationInputs::default()
        };
        assert!(matches!(
            compute_defense(&inputs, &DefenseConfig::default()),
            Err(EngineError::InvalidFortification(_))
        ));
    }

    #[test]
    fn snapshot_new_rejects_negative_bonus_and_clamps_spy_defense() {
        assert!(FortificationSnapshot::new(-0.5, 0.0, 0.0).is_err());
        assert!(FortificationSnapshot::new(1.0, -1.0, 0.0).is_err());
        let snapshot = FortificationSnapshot::new(1.2, 0.0, 140.0).expect("ok");
        approx_eq(snapshot.spy_defense, 100.0);
    }

    #[test]
    fn validate_catches_out_of_range_deserialized_spy_defense() {
        let snapshot: FortificationSnapshot =
            serde_json::from_str(r#"{"defensive_bonus":1.0,"spy_defense":150.0}"#).expect("parse");
        assert!(snapshot.validate().is_err());
    }
}
