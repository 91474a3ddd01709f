//! `tfidf-logreg`: word n-gram TF-IDF features into logistic regression.

mod logistic;
mod vectorizer;

use async_trait::async_trait;

pub use logistic::{LogisticRegression, TrainParams};
pub use vectorizer::TfidfVectorizer;

use crate::corpus::SEED_URLS;
use crate::runtime::{dense_rows, select_device, SparseRow};
use crate::{BackendFactory, BackendSpec, Classifier, Device};

pub const BACKEND_NAME: &str = "tfidf-logreg";

const MAX_FEATURES: usize = 1000;
const MAX_NGRAM: usize = 3;

#[derive(Debug)]
pub struct TfidfBackend {
    name: String,
    device: Device,
    runtime: candle_core::Device,
    vectorizer: TfidfVectorizer,
    model: LogisticRegression,
}

impl TfidfBackend {
    pub fn fit(
        name: &str,
        device: Device,
        runtime: candle_core::Device,
        corpus: &[(&str, u8)],
    ) -> anyhow::Result<Self> {
        let documents: Vec<&str> = corpus.iter().map(|(url, _)| *url).collect();
        let labels: Vec<u8> = corpus.iter().map(|(_, label)| *label).collect();

        let vectorizer = TfidfVectorizer::fit(&documents, MAX_FEATURES, MAX_NGRAM)?;
        let rows: Vec<SparseRow> = documents.iter().map(|doc| vectorizer.transform(doc)).collect();
        let inputs = dense_rows(&rows, vectorizer.len(), &runtime)?;
        let model = LogisticRegression::fit(&inputs, &labels, TrainParams::default())?;

        tracing::debug!(
            target: "urlsentry_backends",
            backend = name,
            features = vectorizer.len(),
            samples = documents.len(),
            "tfidf backend fitted"
        );

        Ok(Self {
            name: name.to_owned(),
            device,
            runtime,
            vectorizer,
            model,
        })
    }
}

impl Classifier for TfidfBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn device(&self) -> Device {
        self.device
    }

    fn predict_proba(&self, text: &str) -> anyhow::Result<[f64; 2]> {
        let row = self.vectorizer.transform(text);
        let input = dense_rows(&[row], self.vectorizer.len(), &self.runtime)?;
        self.model.predict_proba(&input)
    }
}

#[derive(Debug, Default)]
pub struct TfidfFactory;

#[async_trait]
impl BackendFactory for TfidfFactory {
    async fn build(&self, spec: &BackendSpec) -> anyhow::Result<Box<dyn Classifier>> {
        let spec = spec.clone();
        let backend = tokio::task::spawn_blocking(move || {
            let (device, runtime) = select_device(&spec.name, spec.device)?;
            TfidfBackend::fit(&spec.name, device, runtime, SEED_URLS)
        })
        .await??;
        Ok(Box::new(backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device::Cpu;

    fn backend() -> TfidfBackend {
        TfidfBackend::fit(BACKEND_NAME, Device::Cpu, Cpu, SEED_URLS).unwrap()
    }

    #[test]
    fn seed_corpus_is_separated() {
        let backend = backend();
        for (url, label) in SEED_URLS {
            let [safe, malicious] = backend.predict_proba(url).unwrap();
            let predicted = u8::from(malicious > safe);
            assert_eq!(predicted, *label, "misclassified seed url {url}");
        }
    }

    #[test]
    fn unfamiliar_url_still_yields_distribution() {
        let [safe, malicious] = backend().predict_proba("qqqq.zz").unwrap();
        assert!((safe + malicious - 1.0).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&malicious));
    }

    #[tokio::test]
    async fn factory_falls_back_to_cpu_without_cuda() {
        if candle_core::utils::cuda_is_available() {
            return;
        }
        let spec = BackendSpec {
            name: BACKEND_NAME.to_string(),
            device: Device::Gpu,
            max_input_length: 512,
        };
        let classifier = TfidfFactory.build(&spec).await.unwrap();
        assert_eq!(classifier.device(), Device::Cpu);
        assert_eq!(classifier.name(), BACKEND_NAME);
    }
}
