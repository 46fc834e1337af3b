//! Engine configuration: balance constants, optimizer strategy, advisory
//! thresholds and worker count. Every field has a default, so an empty file
//! (or no file at all) is a valid configuration.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::advisor::RecommendationThresholds;
use crate::combat::defense::DefenseConfig;
use crate::combat::engine::SimulationConfig;
use crate::error::{ConfigError, EngineResult};
use crate::optimizer::OptimizerConfig;
use crate::parallel::WorkerPool;

/// Environment variable the CLI reads the configuration path from.
pub const CONFIG_PATH_ENV: &str = "WARROOM_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub simulation: SimulationConfig,
    pub defense: DefenseConfig,
    pub optimizer: OptimizerConfig,
    pub advisor: RecommendationThresholds,
    /// Worker threads for simulation; 0 uses every core.
    pub workers: usize,
}

impl EngineConfig {
    /// Load from `.yaml`/`.yml` (YAML) or any other extension (JSON), then validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = load_structured(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the path in [CONFIG_PATH_ENV], or defaults when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.simulation.validate()?;
        self.defense.validate()?;
        self.optimizer.validate()?;
        self.advisor.validate()?;
        Ok(())
    }

    pub fn worker_pool(&self) -> WorkerPool {
        WorkerPool::with_workers(self.workers)
    }
}

/// Read and decode a YAML or JSON file, choosing the format by extension.
pub fn load_structured<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::power::DefensePolicyKind;
    use crate::error::EngineError;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("warroom-{}-{name}", std::process::id()));
        fs::write(&path, contents).expect("write temp config");
        path
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_fields() {
        let path = write_temp(
            "partial.yaml",
            "simulation:\n  loot_fraction: 0.25\n  defense_policy: class_weighted\noptimizer:\n  max_candidates: 64\n  confirm_top: 3\nworkers: 2\n",
        );
        let config = EngineConfig::load(&path).expect("valid config");
        fs::remove_file(&path).ok();

        assert_eq!(config.simulation.loot_fraction, 0.25);
        assert_eq!(config.simulation.defense_policy, DefensePolicyKind::ClassWeighted);
        assert_eq!(config.simulation.trials_per_batch, 256);
        assert_eq!(config.optimizer.candidates.max_candidates, 64);
        assert_eq!(config.optimizer.candidates.exhaustive_candidate_limit, 256);
        assert_eq!(config.optimizer.confirm_top, 3);
        assert_eq!(config.defense.wall_factor, 1.03);
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn json_is_used_for_other_extensions() {
        let path = write_temp("config.json", r#"{"advisor":{"spy_defense_floor":35.0}}"#);
        let config = EngineConfig::load(&path).expect("valid config");
        fs::remove_file(&path).ok();
        assert_eq!(config.advisor.spy_defense_floor, 35.0);
    }

    #[test]
    fn invalid_values_are_rejected_after_parsing() {
        let path = write_temp(
            "inverted.yaml",
            "simulation:\n  variance:\n    low: 1.2\n    high: 0.8\n",
        );
        let err = EngineConfig::load(&path).expect_err("inverted variance");
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Invalid(EngineError::InvalidInput(_))), "{err}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EngineConfig::load("/nonexistent/warroom.yaml").expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
