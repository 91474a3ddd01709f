use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use urlsentry_backends::{BackendRegistry, BackendSpec, Classifier, Device, FALLBACK_BACKEND};

use crate::config::EngineConfig;
use crate::error::{validate_url, ScoringError, ScoringResult};
use crate::scorer::{Label, Prediction, Scorer, Verdict};

/// Snapshot of which backend is serving and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelState {
    pub backend_name: String,
    pub device: Device,
    pub loaded: bool,
}

impl ModelState {
    fn unloaded(device: Device) -> Self {
        Self {
            backend_name: String::new(),
            device,
            loaded: false,
        }
    }
}

/// Backend and its state, published together so readers never see one
/// without the other.
struct LoadedBackend {
    state: ModelState,
    classifier: Box<dyn Classifier>,
}

/// Scorer backed by a hot-swappable classifier.
///
/// `score` clones the current `Arc` snapshot under a short read lock and
/// infers without holding it, so a reload never blocks or disturbs in-flight
/// requests. Loads are serialized by `load_lock`. A failed reload keeps the
/// previously published backend.
pub struct ModelScorer {
    registry: BackendRegistry,
    default_backend: String,
    device: Device,
    max_input_length: usize,
    current: RwLock<Option<Arc<LoadedBackend>>>,
    load_lock: Mutex<()>,
}

impl ModelScorer {
    pub fn new(config: &EngineConfig, registry: BackendRegistry) -> Self {
        Self {
            registry,
            default_backend: config.default_backend.clone(),
            device: config.device,
            max_input_length: config.max_input_length,
            current: RwLock::new(None),
            load_lock: Mutex::new(()),
        }
    }

    /// Loads `name` (or the configured default). Returns whether a backend
    /// is serving afterwards as a result of this call.
    pub async fn load_backend(&self, name: Option<&str>) -> bool {
        self.try_load_backend(name).await.is_ok()
    }

    pub async fn try_load_backend(&self, name: Option<&str>) -> ScoringResult<ModelState> {
        let _guard = self.load_lock.lock().await;

        let requested = name
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.default_backend.as_str())
            .to_owned();

        tracing::info!(
            target: "urlsentry_scoring",
            backend = %requested,
            device = %self.device,
            "loading backend"
        );

        let first = match self.build(&requested).await {
            Ok(loaded) => return Ok(self.publish(loaded)),
            Err(error) => error,
        };
        tracing::error!(
            target: "urlsentry_scoring",
            backend = %requested,
            error = %first,
            "backend load failed"
        );

        if requested == FALLBACK_BACKEND {
            return Err(self.load_failure(requested, first.to_string()));
        }

        tracing::info!(
            target: "urlsentry_scoring",
            fallback = FALLBACK_BACKEND,
            "falling back to default backend"
        );
        match self.build(FALLBACK_BACKEND).await {
            Ok(loaded) => Ok(self.publish(loaded)),
            Err(second) => {
                tracing::error!(
                    target: "urlsentry_scoring",
                    backend = FALLBACK_BACKEND,
                    error = %second,
                    "fallback backend load failed"
                );
                let message =
                    format!("{first}; fallback `{FALLBACK_BACKEND}` also failed: {second}");
                Err(self.load_failure(requested, message))
            }
        }
    }

    pub fn score(&self, url: &str) -> ScoringResult<Prediction> {
        validate_url(url)?;
        let backend = self.snapshot().ok_or(ScoringError::BackendNotLoaded)?;

        let input = truncate_chars(url, self.max_input_length);
        let probs = backend
            .classifier
            .predict_proba(input)
            .map_err(|e| ScoringError::InferenceFailure(e.to_string()))?;
        if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ScoringError::InferenceFailure(format!(
                "backend `{}` returned invalid probabilities {probs:?}",
                backend.state.backend_name
            )));
        }

        let class = usize::from(probs[1] > probs[0]);
        let prediction = Prediction {
            label: Label::from_class(class),
            confidence: probs[class].clamp(0.0, 1.0),
        };

        tracing::debug!(
            target: "urlsentry_scoring",
            backend = %backend.state.backend_name,
            label = %prediction.label,
            confidence = prediction.confidence,
            "model score"
        );
        Ok(prediction)
    }

    pub fn info(&self) -> ModelState {
        self.snapshot()
            .map(|backend| backend.state.clone())
            .unwrap_or_else(|| ModelState::unloaded(self.device))
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn max_input_length(&self) -> usize {
        self.max_input_length
    }

    async fn build(&self, name: &str) -> anyhow::Result<LoadedBackend> {
        let spec = BackendSpec {
            name: name.to_owned(),
            device: self.device,
            max_input_length: self.max_input_length,
        };
        let classifier = self.registry.build(&spec).await?;
        Ok(LoadedBackend {
            state: ModelState {
                backend_name: name.to_owned(),
                device: classifier.device(),
                loaded: true,
            },
            classifier,
        })
    }

    fn publish(&self, loaded: LoadedBackend) -> ModelState {
        let state = loaded.state.clone();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(loaded));
        tracing::info!(
            target: "urlsentry_scoring",
            backend = %state.backend_name,
            device = %state.device,
            "backend loaded"
        );
        state
    }

    fn load_failure(&self, requested: String, message: String) -> ScoringError {
        if let Some(previous) = self.snapshot() {
            tracing::warn!(
                target: "urlsentry_scoring",
                backend = %previous.state.backend_name,
                "reload failed; keeping previously loaded backend"
            );
        }
        ScoringError::BackendLoadFailure { requested, message }
    }

    fn snapshot(&self) -> Option<Arc<LoadedBackend>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for ModelScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelScorer")
            .field("registry", &self.registry)
            .field("default_backend", &self.default_backend)
            .field("state", &self.info())
            .finish()
    }
}

impl Scorer for ModelScorer {
    fn name(&self) -> String {
        self.info().backend_name
    }

    fn is_loaded(&self) -> bool {
        ModelScorer::is_loaded(self)
    }

    fn score(&self, url: &str) -> ScoringResult<Verdict> {
        ModelScorer::score(self, url).map(Verdict::Model)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use urlsentry_backends::BackendFactory;

    use super::*;

    struct Failing {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BackendFactory for Failing {
        async fn build(&self, spec: &BackendSpec) -> anyhow::Result<Box<dyn Classifier>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("cannot fetch `{}`", spec.name)
        }
    }

    /// Returns a fixed distribution, or fails inference when `probs` is None.
    struct Fixed {
        name: String,
        probs: Option<[f64; 2]>,
    }

    impl Classifier for Fixed {
        fn name(&self) -> &str {
            &self.name
        }

        fn device(&self) -> Device {
            Device::Cpu
        }

        fn predict_proba(&self, text: &str) -> anyhow::Result<[f64; 2]> {
            assert!(text.chars().count() <= 8, "input was not truncated");
            self.probs.ok_or_else(|| anyhow::anyhow!("tensor shape mismatch"))
        }
    }

    struct FixedFactory(Option<[f64; 2]>);

    #[async_trait]
    impl BackendFactory for FixedFactory {
        async fn build(&self, spec: &BackendSpec) -> anyhow::Result<Box<dyn Classifier>> {
            Ok(Box::new(Fixed {
                name: spec.name.clone(),
                probs: self.0,
            }))
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            max_input_length: 8,
            ..EngineConfig::default()
        }
    }

    fn registry_with_failing_fallback(calls: &Arc<AtomicUsize>) -> BackendRegistry {
        let mut registry = BackendRegistry::new();
        registry.register(FALLBACK_BACKEND, Failing { calls: calls.clone() });
        registry
    }

    #[test]
    fn score_before_load_is_rejected() {
        let scorer = ModelScorer::new(&config(), BackendRegistry::with_defaults());
        assert!(matches!(
            scorer.score("https://google.com"),
            Err(ScoringError::BackendNotLoaded)
        ));
        assert!(!scorer.is_loaded());
        assert_eq!(scorer.info(), ModelState::unloaded(Device::Cpu));
    }

    #[test]
    fn empty_url_is_invalid_input() {
        let scorer = ModelScorer::new(&config(), BackendRegistry::with_defaults());
        assert!(matches!(scorer.score("  "), Err(ScoringError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn unknown_backend_falls_back_once_then_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scorer = ModelScorer::new(&config(), registry_with_failing_fallback(&calls));

        assert!(!scorer.load_backend(Some("nonexistent-model")).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!scorer.is_loaded());
        assert!(!scorer.info().loaded);
    }

    #[tokio::test]
    async fn failing_fallback_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scorer = ModelScorer::new(&config(), registry_with_failing_fallback(&calls));

        let error = scorer.try_load_backend(Some(FALLBACK_BACKEND)).await.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match error {
            ScoringError::BackendLoadFailure { requested, message } => {
                assert_eq!(requested, FALLBACK_BACKEND);
                assert!(message.contains("cannot fetch"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_backend_recovers_via_fallback() {
        let scorer = ModelScorer::new(&config(), BackendRegistry::with_defaults());
        let state = scorer.try_load_backend(Some("nonexistent-model")).await.unwrap();
        assert_eq!(state.backend_name, FALLBACK_BACKEND);
        assert!(scorer.info().loaded);
    }

    #[tokio::test]
    async fn successful_load_updates_state() {
        let scorer = ModelScorer::new(&config(), BackendRegistry::with_defaults());
        assert!(scorer.load_backend(Some("hashed-mlp")).await);
        let info = scorer.info();
        assert!(info.loaded);
        assert_eq!(info.backend_name, "hashed-mlp");
        assert_eq!(info.device, Device::Cpu);

        let prediction = scorer.score("http://bit.ly/malware123").unwrap();
        assert!((0.5..=1.0).contains(&prediction.confidence));
    }

    #[tokio::test]
    async fn default_name_comes_from_config() {
        let scorer = ModelScorer::new(&config(), BackendRegistry::with_defaults());
        assert!(scorer.load_backend(None).await);
        assert_eq!(scorer.info().backend_name, config().default_backend);
    }

    #[tokio::test]
    async fn failed_reload_keeps_last_good_backend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = registry_with_failing_fallback(&calls);
        registry.register("stable", FixedFactory(Some([0.2, 0.8])));
        let scorer = ModelScorer::new(&config(), registry);

        assert!(scorer.load_backend(Some("stable")).await);
        assert!(!scorer.load_backend(Some("broken")).await);

        let info = scorer.info();
        assert!(info.loaded);
        assert_eq!(info.backend_name, "stable");
        let prediction = scorer.score("http://example.com/a/very/long/path").unwrap();
        assert_eq!(prediction.label, Label::Malicious);
        assert_eq!(prediction.confidence, 0.8);
    }

    #[tokio::test]
    async fn inference_errors_surface() {
        let mut registry = BackendRegistry::new();
        registry.register("flaky", FixedFactory(None));
        let scorer = ModelScorer::new(&config(), registry);
        assert!(scorer.load_backend(Some("flaky")).await);

        let error = scorer.score("https://google.com").unwrap_err();
        assert!(matches!(error, ScoringError::InferenceFailure(ref m) if m.contains("tensor")));
        // no self-repair: still loaded, same backend
        assert_eq!(scorer.info().backend_name, "flaky");
    }

    #[tokio::test]
    async fn non_finite_probabilities_are_inference_failures() {
        let mut registry = BackendRegistry::new();
        registry.register("nan", FixedFactory(Some([f64::NAN, 0.5])));
        let scorer = ModelScorer::new(&config(), registry);
        assert!(scorer.load_backend(Some("nan")).await);
        assert!(matches!(
            scorer.score("https://google.com"),
            Err(ScoringError::InferenceFailure(_))
        ));
    }

    #[tokio::test]
    async fn ties_resolve_to_safe() {
        let mut registry = BackendRegistry::new();
        registry.register("even", FixedFactory(Some([0.5, 0.5])));
        let scorer = ModelScorer::new(&config(), registry);
        assert!(scorer.load_backend(Some("even")).await);
        assert_eq!(scorer.score("x.io").unwrap().label, Label::Safe);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_scores_survive_reloads() {
        let mut registry = BackendRegistry::new();
        registry.register("a", FixedFactory(Some([0.9, 0.1])));
        registry.register("b", FixedFactory(Some([0.1, 0.9])));
        let scorer = Arc::new(ModelScorer::new(&config(), registry));
        assert!(scorer.load_backend(Some("a")).await);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let scorer = scorer.clone();
                tokio::task::spawn_blocking(move || {
                    for _ in 0..500 {
                        let prediction = scorer.score("https://x.io").unwrap();
                        assert_eq!(prediction.confidence, 0.9);
                    }
                })
            })
            .collect();

        for round in 0..20 {
            let name = if round % 2 == 0 { "b" } else { "a" };
            assert!(scorer.load_backend(Some(name)).await);
        }
        for reader in readers {
            reader.await.unwrap();
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
