//! `hashed-mlp`: hashed character trigrams into a small feed-forward network.

mod network;
mod tokenizer;

use async_trait::async_trait;

pub use network::{NetworkParams, TinyNetwork};
pub use tokenizer::{Encoding, HashingTokenizer};

use crate::corpus::SEED_URLS;
use crate::runtime::{select_device, SparseRow};
use crate::{BackendFactory, BackendSpec, Classifier, Device};

pub const BACKEND_NAME: &str = "hashed-mlp";

const BUCKETS: usize = 512;
const GRAM: usize = 3;

#[derive(Debug)]
pub struct HashedBackend {
    name: String,
    device: Device,
    tokenizer: HashingTokenizer,
    network: TinyNetwork,
}

impl HashedBackend {
    pub fn fit(
        name: &str,
        device: Device,
        runtime: candle_core::Device,
        max_length: usize,
        corpus: &[(&str, u8)],
    ) -> anyhow::Result<Self> {
        let tokenizer = HashingTokenizer::new(BUCKETS, GRAM, max_length)?;
        let samples: Vec<SparseRow> = corpus
            .iter()
            .map(|(url, _)| tokenizer.encode(url).features)
            .collect();
        let labels: Vec<u8> = corpus.iter().map(|(_, label)| *label).collect();
        let network = TinyNetwork::fit(
            &samples,
            &labels,
            tokenizer.buckets(),
            NetworkParams::default(),
            &runtime,
        )?;

        tracing::debug!(
            target: "urlsentry_backends",
            backend = name,
            buckets = BUCKETS,
            samples = samples.len(),
            "hashed backend fitted"
        );

        Ok(Self {
            name: name.to_owned(),
            device,
            tokenizer,
            network,
        })
    }
}

impl Classifier for HashedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn device(&self) -> Device {
        self.device
    }

    fn predict_proba(&self, text: &str) -> anyhow::Result<[f64; 2]> {
        let encoding = self.tokenizer.encode(text);
        if encoding.truncated {
            tracing::debug!(target: "urlsentry_backends", backend = %self.name, "input truncated");
        }
        self.network.predict_proba(&encoding.features)
    }
}

#[derive(Debug, Default)]
pub struct HashedFactory;

#[async_trait]
impl BackendFactory for HashedFactory {
    async fn build(&self, spec: &BackendSpec) -> anyhow::Result<Box<dyn Classifier>> {
        let spec = spec.clone();
        let backend = tokio::task::spawn_blocking(move || {
            let (device, runtime) = select_device(&spec.name, spec.device)?;
            HashedBackend::fit(&spec.name, device, runtime, spec.max_input_length, SEED_URLS)
        })
        .await??;
        Ok(Box::new(backend))
    }
}
