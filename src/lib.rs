//! Battle resolution and troop optimization engine.
//!
//! Given two troop compositions and a defending village's fortification, the
//! engine simulates many randomized battles ([optimizer::monte_carlo::Simulator]),
//! searches troop allocations that maximize a side's win rate
//! ([optimizer::Optimizer]) and turns simulation summaries into advice
//! ([advisor::recommend]). It performs no I/O beyond the CLI and file loaders.

pub mod advisor;
pub mod cli;
pub mod combat;
pub mod config;
pub mod data;
pub mod error;
pub mod logs;
pub mod optimizer;
pub mod parallel;

pub use error::{ConfigError, EngineError, EngineResult};
