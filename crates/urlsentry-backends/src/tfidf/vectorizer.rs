use std::collections::{BTreeMap, HashMap, HashSet};

use crate::runtime::SparseRow;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of",
    "on", "or", "that", "the", "this", "to", "was", "with",
];

/// Word n-gram TF-IDF vectorizer with a frequency-capped vocabulary.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    max_ngram: usize,
}

impl TfidfVectorizer {
    pub fn fit(documents: &[&str], max_features: usize, max_ngram: usize) -> anyhow::Result<Self> {
        let max_ngram = max_ngram.max(1);
        let mut term_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = ngrams(doc, max_ngram);
            let mut seen = HashSet::new();
            for term in terms {
                *term_counts.entry(term.clone()).or_default() += 1;
                if seen.insert(term.clone()) {
                    *doc_freq.entry(term).or_default() += 1;
                }
            }
        }

        if term_counts.is_empty() {
            anyhow::bail!("empty vocabulary; documents contain only stop words or punctuation");
        }

        // Highest corpus frequency first, ties broken lexically so fitting is stable.
        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);
        ranked.sort_by(|a, b| a.0.cmp(&b.0));

        let n_docs = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(ranked.len());
        let mut idf = Vec::with_capacity(ranked.len());
        for (index, (term, _)) in ranked.into_iter().enumerate() {
            let df = doc_freq.get(&term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Ok(Self {
            vocabulary,
            idf,
            max_ngram,
        })
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    /// L2-normalised TF-IDF row. Out-of-vocabulary terms are dropped, so an
    /// unfamiliar URL yields an empty row.
    pub fn transform(&self, document: &str) -> SparseRow {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in ngrams(document, self.max_ngram) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_default() += 1.0;
            }
        }

        let mut row: SparseRow = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, weight) in &mut row {
                *weight /= norm;
            }
        }
        row
    }
}

fn tokens(document: &str) -> Vec<String> {
    document
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2 && !STOP_WORDS.contains(token))
        .map(str::to_owned)
        .collect()
}

fn ngrams(document: &str, max_ngram: usize) -> Vec<String> {
    let words = tokens(document);
    let mut out = Vec::new();
    for n in 1..=max_ngram {
        for window in words.windows(n) {
            out.push(window.join(" "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_drop_stop_words_and_single_chars() {
        assert_eq!(
            tokens("http://a.Example.com/the/Login"),
            vec!["http", "example", "com", "login"]
        );
    }

    #[test]
    fn ngrams_include_bigrams_and_trigrams() {
        let grams = ngrams("secure-login-page", 3);
        assert!(grams.contains(&"secure login".to_string()));
        assert!(grams.contains(&"secure login page".to_string()));
        assert_eq!(grams.len(), 6);
    }

    #[test]
    fn vocabulary_respects_max_features() {
        let vectorizer = TfidfVectorizer::fit(&["alpha beta gamma", "alpha delta"], 2, 1).unwrap();
        assert_eq!(vectorizer.len(), 2);
        // `alpha` is the most frequent term and must survive the cap.
        assert!(!vectorizer.transform("alpha").is_empty());
    }

    #[test]
    fn transform_is_unit_length() {
        let vectorizer =
            TfidfVectorizer::fit(&["google com", "phishing example com"], 100, 2).unwrap();
        let row = vectorizer.transform("phishing-example.com");
        let norm: f64 = row.iter().map(|(_, w)| w * w).sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unseen_terms_yield_empty_row() {
        let vectorizer = TfidfVectorizer::fit(&["google com"], 100, 1).unwrap();
        assert!(vectorizer.transform("zzz.qq").is_empty());
    }

    #[test]
    fn fitting_only_stop_words_fails() {
        assert!(TfidfVectorizer::fit(&["the a of"], 10, 1).is_err());
    }
}
