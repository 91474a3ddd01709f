mod rules;
mod scorer;

pub use rules::{default_rules, Matcher, ScoringRule, KEYWORD_WEIGHT, PATTERN_WEIGHT};
pub use scorer::{HeuristicScorer, ScoreResult};
