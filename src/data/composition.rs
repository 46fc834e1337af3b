use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::data::unit::{UnitCatalog, UnitTypeId};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopEntry {
    pub unit_type: UnitTypeId,
    pub count: u32,
}

impl TroopEntry {
    pub fn new(unit_type: impl Into<UnitTypeId>, count: u32) -> Self {
        Self {
            unit_type: unit_type.into(),
            count,
        }
    }
}

/// An army: ordered troop entries with unique unit types.
///
/// Compositions are value objects. The engine only reads the ones it is given
/// and builds new ones (optimizer candidates).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TroopEntry>", into = "Vec<TroopEntry>")]
pub struct Composition {
    entries: Vec<TroopEntry>,
}

impl Composition {
    pub fn new(entries: Vec<TroopEntry>) -> EngineResult<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(&entry.unit_type) {
                return Err(EngineError::invalid_input(format!(
                    "unit type '{}' appears more than once in composition",
                    entry.unit_type
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_counts<I, S>(pairs: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<UnitTypeId>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(unit_type, count)| TroopEntry::new(unit_type, count))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[TroopEntry] {
        &self.entries
    }

    pub fn count_of(&self, unit_type: &UnitTypeId) -> u32 {
        self.entries
            .iter()
            .find(|entry| &entry.unit_type == unit_type)
            .map_or(0, |entry| entry.count)
    }

    pub fn total_troops(&self) -> u64 {
        self.entries.iter().map(|entry| u64::from(entry.count)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_troops() == 0
    }

    /// Speed of the slowest unit actually present, or `None` for an empty army.
    pub fn march_speed(&self, catalog: &UnitCatalog) -> EngineResult<Option<f64>> {
        let mut slowest: Option<f64> = None;
        for entry in self.entries.iter().filter(|entry| entry.count > 0) {
            let speed = catalog.require(&entry.unit_type)?.speed;
            slowest = Some(slowest.map_or(speed, |current| current.min(speed)));
        }
        Ok(slowest)
    }
}

impl TryFrom<Vec<TroopEntry>> for Composition {
    type Error = EngineError;

    fn try_from(entries: Vec<TroopEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<Composition> for Vec<TroopEntry> {
    fn from(composition: Composition) -> Self {
        composition.entries
    }
}
