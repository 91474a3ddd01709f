pub mod config;
pub mod engine;
pub mod error;
pub mod heuristic;
pub mod model;
pub mod scorer;

pub use config::{EngineConfig, StrategyKind};
pub use engine::{EngineInfo, ScoringEngine};
pub use error::{ErrorKind, ScoringError, ScoringResult};
pub use heuristic::{HeuristicScorer, ScoreResult, ScoringRule};
pub use model::{ModelScorer, ModelState};
pub use scorer::{Label, Prediction, Scorer, Verdict};
pub use urlsentry_backends::{
    BackendFactory, BackendRegistry, BackendSpec, Classifier, Device, FALLBACK_BACKEND,
};
