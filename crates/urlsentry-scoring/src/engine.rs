use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use urlsentry_backends::BackendRegistry;

use crate::config::{EngineConfig, StrategyKind};
use crate::error::{validate_url, ScoringResult};
use crate::heuristic::{HeuristicScorer, ScoreResult};
use crate::model::{ModelScorer, ModelState};
use crate::scorer::{Prediction, Scorer, Verdict};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineInfo {
    pub strategy: StrategyKind,
    pub model: ModelState,
    pub decision_threshold: f64,
    pub max_input_length: usize,
}

/// Facade over both scorers. One instance is built per process and shared
/// by reference (typically `Arc<ScoringEngine>`).
#[derive(Debug)]
pub struct ScoringEngine {
    config: EngineConfig,
    heuristic: HeuristicScorer,
    model: ModelScorer,
    strategy: RwLock<StrategyKind>,
}

impl ScoringEngine {
    pub fn new(config: EngineConfig) -> ScoringResult<Self> {
        Self::with_registry(config, BackendRegistry::with_defaults())
    }

    pub fn with_registry(config: EngineConfig, registry: BackendRegistry) -> ScoringResult<Self> {
        config.validate()?;
        let heuristic = HeuristicScorer::new(config.decision_threshold)?;
        let model = ModelScorer::new(&config, registry);
        Ok(Self {
            strategy: RwLock::new(config.strategy),
            config,
            heuristic,
            model,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn heuristic(&self) -> &HeuristicScorer {
        &self.heuristic
    }

    pub fn model(&self) -> &ModelScorer {
        &self.model
    }

    pub fn strategy(&self) -> StrategyKind {
        *self.strategy.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_strategy(&self, strategy: StrategyKind) {
        let mut current = self.strategy.write().unwrap_or_else(PoisonError::into_inner);
        let previous = *current;
        if previous != strategy {
            tracing::info!(
                target: "urlsentry_scoring",
                from = %previous,
                to = %strategy,
                "switching scoring strategy"
            );
            *current = strategy;
        }
    }

    fn active(&self) -> &dyn Scorer {
        match self.strategy() {
            StrategyKind::Heuristic => &self.heuristic as &dyn Scorer,
            StrategyKind::Model => &self.model as &dyn Scorer,
        }
    }

    /// Scores with whichever strategy is active.
    pub fn score(&self, url: &str) -> ScoringResult<Verdict> {
        self.active().score(url)
    }

    /// Heuristic scoring regardless of the active strategy.
    pub fn detect(&self, url: &str) -> ScoringResult<ScoreResult> {
        validate_url(url)?;
        Ok(self.heuristic.score(url))
    }

    /// Model scoring regardless of the active strategy.
    pub fn predict(&self, url: &str) -> ScoringResult<Prediction> {
        self.model.score(url)
    }

    pub async fn load_backend(&self, name: Option<&str>) -> bool {
        self.model.load_backend(name).await
    }

    pub async fn try_load_backend(&self, name: Option<&str>) -> ScoringResult<ModelState> {
        self.model.try_load_backend(name).await
    }

    /// Whether the active strategy can answer `score`.
    pub fn is_loaded(&self) -> bool {
        self.active().is_loaded()
    }

    pub fn model_info(&self) -> ModelState {
        self.model.info()
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            strategy: self.strategy(),
            model: self.model.info(),
            decision_threshold: self.heuristic.threshold(),
            max_input_length: self.model.max_input_length(),
        }
    }
}
