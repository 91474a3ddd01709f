use regex::{Regex, RegexBuilder};

pub const PATTERN_WEIGHT: f64 = 0.2;
pub const KEYWORD_WEIGHT: f64 = 0.1;

/// `(issue label, case-insensitive pattern)`, evaluated in order.
const PATTERNS: &[(&str, &str)] = &[
    ("malware vocabulary", r"malware"),
    ("virus vocabulary", r"virus"),
    ("trojan vocabulary", r"trojan"),
    ("phishing vocabulary", r"phish"),
    ("scam vocabulary", r"scam"),
    (
        "executable file extension",
        r"\.(?:exe|scr|bat|cmd|msi|vbs|jar|apk|dll|ps1)(?:$|[?#/])",
    ),
    (
        "url shortener",
        r"(?:^|[/.@])(?:bit\.ly|tinyurl\.com|goo\.gl|t\.co|ow\.ly|is\.gd|buff\.ly|rebrand\.ly|cutt\.ly|shorturl\.at)(?:$|[/:?#])",
    ),
    (
        "private or reserved ip address",
        r"(?:^|[/@])(?:10(?:\.\d{1,3}){3}|172\.(?:1[6-9]|2\d|3[01])(?:\.\d{1,3}){2}|192\.168(?:\.\d{1,3}){2}|127(?:\.\d{1,3}){3}|169\.254(?:\.\d{1,3}){2}|0\.0\.0\.0)(?:$|[/:?#])",
    ),
];

const KEYWORDS: &[&str] = &[
    "malware", "virus", "trojan", "spyware", "phishing", "scam", "fake", "hack",
];

#[derive(Debug, Clone)]
pub enum Matcher {
    Pattern(Regex),
    /// Lowercase needle, matched against the lowercased url.
    Keyword(String),
}

/// A matcher, the confidence it contributes, and the issue it reports.
#[derive(Debug, Clone)]
pub struct ScoringRule {
    matcher: Matcher,
    weight: f64,
    issue: String,
}

impl ScoringRule {
    pub fn pattern(label: &str, pattern: &str, weight: f64) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            matcher: Matcher::Pattern(regex),
            weight,
            issue: format!("Suspicious pattern: {label}"),
        })
    }

    pub fn keyword(keyword: &str, weight: f64) -> Self {
        let keyword = keyword.to_lowercase();
        Self {
            issue: format!("Suspicious keyword: {keyword}"),
            matcher: Matcher::Keyword(keyword),
            weight,
        }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn issue(&self) -> &str {
        &self.issue
    }

    /// `lowered` must be `url.to_lowercase()`; keyword rules only look at it.
    pub fn matches(&self, url: &str, lowered: &str) -> bool {
        match &self.matcher {
            Matcher::Pattern(regex) => regex.is_match(url),
            Matcher::Keyword(needle) => lowered.contains(needle.as_str()),
        }
    }
}

/// Built-in rule set: pattern rules first, then keyword rules.
pub fn default_rules() -> Result<Vec<ScoringRule>, regex::Error> {
    let mut rules = Vec::with_capacity(PATTERNS.len() + KEYWORDS.len());
    for (label, pattern) in PATTERNS {
        rules.push(ScoringRule::pattern(label, pattern, PATTERN_WEIGHT)?);
    }
    rules.extend(KEYWORDS.iter().map(|kw| ScoringRule::keyword(kw, KEYWORD_WEIGHT)));
    Ok(rules)
}
