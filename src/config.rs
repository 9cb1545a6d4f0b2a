use crate::error::ConfigError;
use crate::game::GameConfig;
use crate::lookahead::LookaheadConfig;
use crate::trainer::TrainingConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a run needs. Any field missing from a config file keeps its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub game: GameConfig,
    pub training: TrainingConfig,
    pub lookahead: LookaheadConfig,
    pub table_path: PathBuf,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            training: TrainingConfig::default(),
            lookahead: LookaheadConfig::default(),
            table_path: PathBuf::from("q_table.bin"),
            seed: None,
        }
    }
}

impl Config {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate()?;
        self.training.validate()?;
        self.lookahead.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.game.width, 20);
        assert_eq!(config.training.learning_rate, 0.1);
        assert_eq!(config.training.rewards.step, -0.1);
        assert_eq!(config.lookahead.rollouts, 5);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "game": { "width": 12 }, "training": { "episodes": 7 }, "seed": 3 }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.game.width, 12);
        assert_eq!(config.game.height, 20);
        assert_eq!(config.training.episodes, 7);
        assert_eq!(config.training.discount, 0.99);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.table_path, PathBuf::from("q_table.bin"));
    }

    #[test]
    fn invalid_probability_is_caught() {
        let json = r#"{ "game": { "hazard_spawn_probability": 2.0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Probability { .. })));
    }
}
