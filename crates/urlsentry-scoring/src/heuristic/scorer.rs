use serde::{Deserialize, Serialize};

use super::rules::{default_rules, ScoringRule};
use crate::error::{validate_url, ScoringError, ScoringResult};
use crate::scorer::{Scorer, Verdict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub is_malicious: bool,
    pub confidence: f64,
    pub matched_issues: Vec<String>,
}

/// Rule-based scorer: every matching rule adds its weight to the score.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    rules: Vec<ScoringRule>,
    threshold: f64,
}

impl HeuristicScorer {
    pub fn new(threshold: f64) -> ScoringResult<Self> {
        let rules = default_rules()
            .map_err(|e| ScoringError::Config(format!("invalid built-in rule: {e}")))?;
        Ok(Self::with_rules(rules, threshold))
    }

    pub fn with_rules(rules: Vec<ScoringRule>, threshold: f64) -> Self {
        Self { rules, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn rules(&self) -> &[ScoringRule] {
        &self.rules
    }

    /// Scores a non-empty url. Maliciousness is decided on the raw sum, the
    /// reported confidence is clamped to [0, 1] afterwards.
    pub fn score(&self, url: &str) -> ScoreResult {
        let lowered = url.to_lowercase();
        let mut raw = 0.0;
        let mut matched_issues = Vec::new();

        for rule in &self.rules {
            if rule.matches(url, &lowered) {
                raw += rule.weight();
                matched_issues.push(rule.issue().to_owned());
            }
        }

        // Weights are decimal fractions; snap the sum so 0.2 + 0.1 compares
        // equal to a 0.3 threshold.
        let raw = (raw * 1e6_f64).round() / 1e6;
        let is_malicious = raw > self.threshold;
        let confidence = raw.clamp(0.0, 1.0);

        tracing::debug!(
            target: "urlsentry_scoring",
            url,
            raw,
            confidence,
            issues = matched_issues.len(),
            is_malicious,
            "heuristic score"
        );

        ScoreResult {
            is_malicious,
            confidence,
            matched_issues,
        }
    }
}

impl Scorer for HeuristicScorer {
    fn name(&self) -> String {
        "heuristic".to_string()
    }

    fn is_loaded(&self) -> bool {
        true
    }

    fn score(&self, url: &str) -> ScoringResult<Verdict> {
        validate_url(url)?;
        Ok(Verdict::Heuristic(HeuristicScorer::score(self, url)))
    }
}
