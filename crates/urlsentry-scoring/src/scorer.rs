use serde::{Deserialize, Serialize};

use crate::error::ScoringResult;
use crate::heuristic::ScoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Safe,
    Malicious,
}

impl Label {
    /// Maps a class index (0 safe, 1 malicious).
    pub fn from_class(class: usize) -> Self {
        if class == 1 {
            Label::Malicious
        } else {
            Label::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Safe => "safe",
            Label::Malicious => "malicious",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a model-backed score: the predicted class and the backend's
/// probability for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Heuristic(ScoreResult),
    Model(Prediction),
}

impl Verdict {
    pub fn is_malicious(&self) -> bool {
        match self {
            Verdict::Heuristic(result) => result.is_malicious,
            Verdict::Model(prediction) => prediction.label == Label::Malicious,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Verdict::Heuristic(result) => result.confidence,
            Verdict::Model(prediction) => prediction.confidence,
        }
    }

    pub fn label(&self) -> Label {
        if self.is_malicious() {
            Label::Malicious
        } else {
            Label::Safe
        }
    }
}

/// Common capability of the heuristic and model-backed scorers.
pub trait Scorer: Send + Sync {
    fn name(&self) -> String;
    fn is_loaded(&self) -> bool;
    fn score(&self, url: &str) -> ScoringResult<Verdict>;
}
