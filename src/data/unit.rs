//! Unit stat model: static per-unit-type records and the read-only catalog.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::composition::Composition;
use crate::error::{EngineError, EngineResult};

/// Identifier of a unit type, e.g. `legionnaire`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitTypeId(String);

impl UnitTypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitTypeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Broad unit class. Only class-aware defense policies and advisories read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    #[default]
    Infantry,
    Cavalry,
    Scout,
    Siege,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub attack: u32,
    pub defense_infantry: u32,
    pub defense_cavalry: u32,
    pub speed: f64,
    pub carry_capacity: u32,
    #[serde(default)]
    pub class: UnitClass,
}

impl UnitStats {
    pub fn new(
        attack: u32,
        defense_infantry: u32,
        defense_cavalry: u32,
        speed: f64,
        carry_capacity: u32,
    ) -> Self {
        Self {
            attack,
            defense_infantry,
            defense_cavalry,
            speed,
            carry_capacity,
            class: UnitClass::Infantry,
        }
    }

    pub fn with_class(self, class: UnitClass) -> Self {
        Self { class, ..self }
    }
}

/// One catalog row as it appears in scenario files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub id: UnitTypeId,
    #[serde(flatten)]
    pub stats: UnitStats,
}

/// Read-only unit catalog, ordered by id so iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnitCatalog {
    units: BTreeMap<UnitTypeId, UnitStats>,
}

impl UnitCatalog {
    /// Build a catalog, rejecting duplicate ids and unusable speeds.
    pub fn new(definitions: impl IntoIterator<Item = UnitDefinition>) -> EngineResult<Self> {
        let mut units = BTreeMap::new();
        for definition in definitions {
            if !definition.stats.speed.is_finite() || definition.stats.speed < 0.0 {
                return Err(EngineError::invalid_input(format!(
                    "unit '{}' has invalid speed {}",
                    definition.id, definition.stats.speed
                )));
            }
            if units.contains_key(&definition.id) {
                return Err(EngineError::invalid_input(format!(
                    "duplicate unit type '{}' in catalog",
                    definition.id
                )));
            }
            units.insert(definition.id, definition.stats);
        }
        Ok(Self { units })
    }

    pub fn get(&self, id: &UnitTypeId) -> Option<&UnitStats> {
        self.units.get(id)
    }

    /// Look up a unit, failing with [EngineError::UnknownUnitType].
    pub fn require(&self, id: &UnitTypeId) -> EngineResult<&UnitStats> {
        self.units
            .get(id)
            .ok_or_else(|| EngineError::UnknownUnitType(id.clone()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &UnitTypeId> {
        self.units.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UnitTypeId, &UnitStats)> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Resolve every entry of a composition against the catalog once, up front.
    pub fn resolve<'c>(
        &'c self,
        composition: &'c Composition,
    ) -> EngineResult<Vec<(&'c UnitTypeId, &'c UnitStats, u32)>> {
        composition
            .entries()
            .iter()
            .map(|entry| {
                self.require(&entry.unit_type)
                    .map(|stats| (&entry.unit_type, stats, entry.count))
            })
            .collect()
    }
}
