//! Error types returned across the engine boundary.
//!
//! Every engine error is a caller input defect: nothing here is transient and
//! nothing is retried internally.

use std::path::PathBuf;

use thiserror::Error;

use crate::data::unit::UnitTypeId;

/// Errors produced by the battle engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown unit type '{0}'")]
    UnknownUnitType(UnitTypeId),

    #[error("invalid fortification: {0}")]
    InvalidFortification(String),
}

impl EngineError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_fortification(message: impl Into<String>) -> Self {
        Self::InvalidFortification(message.into())
    }
}

/// Errors raised while loading configuration or scenario files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse yaml '{path}': {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unable to parse json '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] EngineError),
}

pub type EngineResult<T> = Result<T, EngineError>;
