use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use urlsentry_scoring::{Device, EngineConfig, StrategyKind};

#[derive(Debug, Parser)]
#[command(name = "urlsentry", version, about = "URL risk scoring service")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP service.
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "PORT", default_value_t = 5001)]
        port: u16,
        /// Upper bound for a backend reload, in seconds.
        #[arg(long, env = "TIMEOUT", default_value_t = 30)]
        timeout: u64,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Score a single url and print the verdict as JSON.
    Score {
        url: String,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Load the configured backend and print engine info as JSON.
    Info {
        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Engine settings; flags override the optional TOML file, which overrides
/// built-in defaults.
#[derive(Debug, Clone, clap::Args)]
pub struct EngineArgs {
    #[arg(long, env = "HF_MODEL_NAME")]
    pub backend: Option<String>,
    #[arg(long, env = "DEVICE", value_enum)]
    pub device: Option<DeviceChoice>,
    #[arg(long = "max-length", env = "MAX_LENGTH")]
    pub max_length: Option<usize>,
    #[arg(long, env = "DECISION_THRESHOLD")]
    pub threshold: Option<f64>,
    #[arg(long, env = "SCORING_STRATEGY", value_enum)]
    pub strategy: Option<StrategyChoice>,
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl EngineArgs {
    pub fn to_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_toml_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(backend) = &self.backend {
            config.default_backend = backend.clone();
        }
        if let Some(device) = self.device {
            config.device = device.into();
        }
        if let Some(max_length) = self.max_length {
            config.max_input_length = max_length;
        }
        if let Some(threshold) = self.threshold {
            config.decision_threshold = threshold;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy.into();
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DeviceChoice {
    Cpu,
    #[value(alias = "cuda")]
    Gpu,
}

impl From<DeviceChoice> for Device {
    fn from(value: DeviceChoice) -> Self {
        match value {
            DeviceChoice::Cpu => Device::Cpu,
            DeviceChoice::Gpu => Device::Gpu,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyChoice {
    Heuristic,
    Model,
}

impl From<StrategyChoice> for StrategyKind {
    fn from(value: StrategyChoice) -> Self {
        match value {
            StrategyChoice::Heuristic => StrategyKind::Heuristic,
            StrategyChoice::Model => StrategyKind::Model,
        }
    }
}
