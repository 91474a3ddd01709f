use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use urlsentry_scoring::{ErrorKind, ScoringEngine, ScoringError};

pub const SERVICE_NAME: &str = "urlsentry";

/// Hosting settings echoed by `/info`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSettings {
    pub host: String,
    pub port: u16,
    pub timeout: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScoringEngine>,
    pub settings: Arc<ServiceSettings>,
}

pub enum ApiError {
    MissingUrl,
    InvalidUrl,
    Scoring(ScoringError),
}

impl From<ScoringError> for ApiError {
    fn from(err: ScoringError) -> Self {
        Self::Scoring(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MissingUrl => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Missing 'url' in request body" }),
            ),
            ApiError::InvalidUrl => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid URL provided" }),
            ),
            ApiError::Scoring(err) => match err.kind() {
                ErrorKind::InvalidInput => (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "Invalid URL provided" }),
                ),
                ErrorKind::BackendNotLoaded => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "Model not loaded", "message": err.to_string() }),
                ),
                _ => {
                    tracing::error!(target: "urlsentry", error = %err, "request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": "Internal server error", "message": err.to_string() }),
                    )
                }
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Pulls a non-empty string `url` out of a JSON body.
fn url_from_body(body: &[u8]) -> Result<String, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::MissingUrl)?;
    match value.get("url") {
        None | Some(Value::Null) => Err(ApiError::MissingUrl),
        Some(Value::String(url)) if !url.is_empty() => Ok(url.clone()),
        Some(_) => Err(ApiError::InvalidUrl),
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "model_loaded": state.engine.model().is_loaded(),
    }))
}

async fn info(State(state): State<AppState>) -> Json<Value> {
    let info = state.engine.info();
    Json(json!({
        "service": SERVICE_NAME,
        "model_info": info.model,
        "strategy": info.strategy,
        "config": {
            "host": state.settings.host,
            "port": state.settings.port,
            "timeout": state.settings.timeout,
            "max_length": info.max_input_length,
            "threshold": info.decision_threshold,
        },
    }))
}

async fn predict(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let url = url_from_body(&body)?;
    let prediction = state.engine.predict(&url)?;
    let model = state.engine.model_info().backend_name;

    tracing::info!(
        target: "urlsentry",
        url = %url,
        label = %prediction.label,
        confidence = prediction.confidence,
        "prediction"
    );

    Ok(Json(json!({
        "url": url,
        "prediction": prediction.label,
        "confidence": prediction.confidence,
        "model": model,
    })))
}

async fn detect(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let url = url_from_body(&body)?;
    let result = state.engine.detect(&url)?;

    tracing::info!(
        target: "urlsentry",
        url = %url,
        is_malicious = result.is_malicious,
        confidence = result.confidence,
        "detection"
    );

    Ok(Json(json!({
        "url": url,
        "is_malicious": result.is_malicious,
        "confidence": result.confidence,
        "issues": result.matched_issues,
    })))
}

async fn score(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let url = url_from_body(&body)?;
    let verdict = state.engine.score(&url)?;
    Ok(Json(json!({
        "url": url,
        "strategy": state.engine.strategy(),
        "label": verdict.label(),
        "is_malicious": verdict.is_malicious(),
        "confidence": verdict.confidence(),
        "result": verdict,
    })))
}

async fn reload(State(state): State<AppState>, body: Bytes) -> Response {
    let requested = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|value| value.get("model_name").and_then(Value::as_str).map(str::to_owned))
    };
    let label = requested
        .clone()
        .unwrap_or_else(|| state.engine.config().default_backend.clone());

    let limit = Duration::from_secs(state.settings.timeout.max(1));
    let load = state.engine.try_load_backend(requested.as_deref());
    let outcome = tokio::time::timeout(limit, load).await;

    match outcome {
        Ok(Ok(model_info)) => Json(json!({
            "status": "success",
            "message": format!("Model reloaded: {}", model_info.backend_name),
            "model_info": model_info,
        }))
        .into_response(),
        Ok(Err(err)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "error",
                "message": format!("Failed to load model: {label}"),
                "detail": err.to_string(),
                "model_info": state.engine.model_info(),
            })),
        )
            .into_response(),
        Err(_) => {
            tracing::error!(target: "urlsentry", backend = %label, "reload timed out");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": format!("Timed out loading model: {label}"),
                    "model_info": state.engine.model_info(),
                })),
            )
                .into_response()
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/predict", post(predict))
        .route("/detect", post(detect))
        .route("/score", post(score))
        .route("/reload", post(reload))
        .with_state(state)
}
