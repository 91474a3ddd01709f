use std::path::Path;

use serde::{Deserialize, Serialize};
use urlsentry_backends::{Device, FALLBACK_BACKEND};

use crate::error::{ScoringError, ScoringResult};

pub const DEFAULT_THRESHOLD: f64 = 0.3;
pub const DEFAULT_MAX_INPUT_LENGTH: usize = 512;

/// Which scorer answers `ScoringEngine::score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Heuristic,
    Model,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StrategyKind::Heuristic => "heuristic",
            StrategyKind::Model => "model",
        };
        write!(f, "{label}")
    }
}

/// Explicit configuration for a [`crate::ScoringEngine`]. The engine never
/// reads the environment itself; callers build this from whatever source
/// they like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_backend: String,
    pub device: Device,
    pub max_input_length: usize,
    pub decision_threshold: f64,
    pub strategy: StrategyKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_backend: FALLBACK_BACKEND.to_string(),
            device: Device::Cpu,
            max_input_length: DEFAULT_MAX_INPUT_LENGTH,
            decision_threshold: DEFAULT_THRESHOLD,
            strategy: StrategyKind::Heuristic,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> ScoringResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| ScoringError::Config(format!("invalid toml: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> ScoringResult<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| ScoringError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> ScoringResult<()> {
        if self.default_backend.trim().is_empty() {
            return Err(ScoringError::Config("default_backend must not be empty".into()));
        }
        if self.max_input_length == 0 {
            return Err(ScoringError::Config("max_input_length must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(ScoringError::Config(format!(
                "decision_threshold {} is outside [0, 1]",
                self.decision_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            default_backend = "hashed-mlp"
            device = "gpu"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_backend, "hashed-mlp");
        assert_eq!(config.device, Device::Gpu);
        assert_eq!(config.max_input_length, DEFAULT_MAX_INPUT_LENGTH);
        assert_eq!(config.decision_threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.strategy, StrategyKind::Heuristic);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let error = EngineConfig::from_toml_str("decision_threshold = 1.5").unwrap_err();
        assert!(matches!(error, ScoringError::Config(_)));
    }

    #[test]
    fn zero_max_length_is_rejected() {
        let config = EngineConfig {
            max_input_length: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_device_is_rejected() {
        assert!(EngineConfig::from_toml_str("device = \"tpu\"").is_err());
    }
}
