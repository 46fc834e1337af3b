//! Scenario files: a unit catalog plus one battle, as consumed by the CLI.
//!
//! ```yaml
//! units:
//!   - { id: legionnaire, attack: 40, defense_infantry: 35, defense_cavalry: 50, speed: 6.0, carry_capacity: 50 }
//! attacker:
//!   - { unit_type: legionnaire, count: 100 }
//! defender: []
//! fortification: { wall_level: 5 }
//! defender_resources: { lumber: 800 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combat::defense::{compute_defense, DefenseConfig, FortificationInputs};
use crate::combat::engine::BattleSetup;
use crate::config::load_structured;
use crate::data::composition::Composition;
use crate::data::resources::ResourceStock;
use crate::data::unit::{UnitCatalog, UnitDefinition};
use crate::error::{ConfigError, EngineResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub units: Vec<UnitDefinition>,
    #[serde(default)]
    pub attacker: Composition,
    #[serde(default)]
    pub defender: Composition,
    #[serde(default)]
    pub fortification: FortificationInputs,
    #[serde(default)]
    pub defender_resources: ResourceStock,
}

impl ScenarioFile {
    /// Parse a YAML (`.yaml`/`.yml`) or JSON scenario. Contents are checked
    /// later, by [ScenarioFile::catalog] and [ScenarioFile::battle_setup] or by
    /// [crate::data::validate::validate_scenario].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_structured(path.as_ref())
    }

    pub fn catalog(&self) -> EngineResult<UnitCatalog> {
        UnitCatalog::new(self.units.iter().cloned())
    }

    pub fn battle_setup(&self, defense: &DefenseConfig) -> EngineResult<BattleSetup> {
        let fortification = compute_defense(&self.fortification, defense)?;
        Ok(
            BattleSetup::new(self.attacker.clone(), self.defender.clone(), fortification)
                .with_resources(self.defender_resources.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::resources::ResourceKind;
    use crate::data::unit::UnitTypeId;

    const SCENARIO: &str = r#"
units:
  - { id: legionnaire, attack: 40, defense_infantry: 35, defense_cavalry: 50, speed: 6.0, carry_capacity: 50 }
  - { id: equites_imperatoris, attack: 120, defense_infantry: 65, defense_cavalry: 50, speed: 14.0, carry_capacity: 100, class: cavalry }
attacker:
  - { unit_type: legionnaire, count: 100 }
defender:
  - { unit_type: equites_imperatoris, count: 5 }
fortification:
  wall_level: 3
  residence_level: 2
defender_resources:
  lumber: 800
  crop: 200
"#;

    #[test]
    fn yaml_scenario_resolves_to_a_battle() {
        let scenario: ScenarioFile = serde_yaml::from_str(SCENARIO).expect("parse");
        let catalog = scenario.catalog().expect("catalog");
        assert_eq!(catalog.len(), 2);

        let setup = scenario.battle_setup(&DefenseConfig::default()).expect("setup");
        assert_eq!(setup.attacker.count_of(&UnitTypeId::new("legionnaire")), 100);
        assert!((setup.fortification.defensive_bonus - 1.03f64.powi(3)).abs() < 1e-9);
        assert_eq!(setup.fortification.flat_defense, 8.0);
        assert_eq!(setup.defender_resources.get(ResourceKind::Lumber), 800);
    }

    #[test]
    fn duplicate_entries_fail_to_parse() {
        let raw = "units: []\nattacker:\n  - { unit_type: a, count: 1 }\n  - { unit_type: a, count: 2 }\n";
        assert!(serde_yaml::from_str::<ScenarioFile>(raw).is_err());
    }
}
