use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{hashed, tfidf, BackendFactory, BackendSpec, Classifier};

/// Backend tried once when a requested backend fails to load.
pub const FALLBACK_BACKEND: &str = tfidf::BACKEND_NAME;

/// Name-to-factory table the model scorer resolves backends through.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, Arc<dyn BackendFactory>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled `tfidf-logreg` and `hashed-mlp` backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(tfidf::BACKEND_NAME, tfidf::TfidfFactory);
        registry.register(hashed::BACKEND_NAME, hashed::HashedFactory);
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: BackendFactory + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub async fn build(&self, spec: &BackendSpec) -> anyhow::Result<Box<dyn Classifier>> {
        let Some(factory) = self.factories.get(&spec.name) else {
            let known: Vec<&str> = self.names().collect();
            anyhow::bail!("unknown backend `{}` (known: {})", spec.name, known.join(", "));
        };
        factory.build(spec).await
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
