use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Lumber,
    Clay,
    Iron,
    Crop,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [Self::Lumber, Self::Clay, Self::Iron, Self::Crop];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lumber => "lumber",
            Self::Clay => "clay",
            Self::Iron => "iron",
            Self::Crop => "crop",
        }
    }
}

/// Resources stored in a village (the loot pool on a successful attack).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceStock {
    amounts: BTreeMap<ResourceKind, u64>,
}

impl ResourceStock {
    pub fn new(amounts: impl IntoIterator<Item = (ResourceKind, u64)>) -> Self {
        Self {
            amounts: amounts.into_iter().collect(),
        }
    }

    pub fn get(&self, kind: ResourceKind) -> u64 {
        self.amounts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.amounts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u64)> + '_ {
        self.amounts.iter().map(|(kind, amount)| (*kind, *amount))
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
