use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Execution device a backend is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
    Gpu,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Device::Cpu => "cpu",
            Device::Gpu => "gpu",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for Device {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            // `cuda` is what most model tooling calls the accelerator.
            "gpu" | "cuda" => Ok(Device::Gpu),
            other => anyhow::bail!("unsupported device `{other}` (expected cpu or gpu)"),
        }
    }
}

/// Everything a factory needs to construct a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    pub name: String,
    pub device: Device,
    pub max_input_length: usize,
}

/// A loaded binary text classifier.
///
/// Class 0 is "safe", class 1 is "malicious". Implementations are read-only
/// after construction so a single instance can serve concurrent callers.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;
    fn device(&self) -> Device;
    fn predict_proba(&self, text: &str) -> anyhow::Result<[f64; 2]>;
}

/// Builds a [`Classifier`] for a [`BackendSpec`].
///
/// Construction may fit or fetch parameters. Implementations move CPU-bound
/// work onto the blocking pool so the returned future stays cancellable.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn build(&self, spec: &BackendSpec) -> anyhow::Result<Box<dyn Classifier>>;
}
