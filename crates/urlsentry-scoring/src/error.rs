use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model not ready: no backend has been loaded")]
    BackendNotLoaded,

    #[error("failed to load backend `{requested}`: {message}")]
    BackendLoadFailure { requested: String, message: String },

    #[error("inference failed: {0}")]
    InferenceFailure(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Stable discriminant for mapping failures onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    BackendNotLoaded,
    BackendLoadFailure,
    InferenceFailure,
    Config,
}

impl ScoringError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoringError::InvalidInput(_) => ErrorKind::InvalidInput,
            ScoringError::BackendNotLoaded => ErrorKind::BackendNotLoaded,
            ScoringError::BackendLoadFailure { .. } => ErrorKind::BackendLoadFailure,
            ScoringError::InferenceFailure(_) => ErrorKind::InferenceFailure,
            ScoringError::Config(_) => ErrorKind::Config,
        }
    }
}

pub type ScoringResult<T> = Result<T, ScoringError>;

/// Rejects inputs no scorer can work with. Whitespace-only strings are
/// accepted and scored like any other text.
pub fn validate_url(url: &str) -> ScoringResult<()> {
    if url.is_empty() {
        return Err(ScoringError::InvalidInput("url must be a non-empty string".into()));
    }
    Ok(())
}
