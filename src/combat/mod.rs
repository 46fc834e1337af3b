pub mod defense;
pub mod engine;
pub mod power;
pub mod rng;

pub use defense::{compute_defense, DefenseConfig, FortificationInputs, FortificationSnapshot};
pub use engine::{
    classify_outcome, BattleSetup, BattleTrialResult, CasualtyModel, Outcome, PowerVariance,
    ResolvedBattle, SimulationConfig, DECISIVE_RATIO,
};
pub use power::{
    compute_power, ClassWeightedDefense, CombinedDefense, DefensePolicyKind,
    DefenseSelectionPolicy, PowerProfile,
};
pub use rng::{entropy_seed, RandomSource, Rng};
