use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use urlsentry_scoring::{ScoringEngine, StrategyKind};

mod cli;
mod http;
use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("URLSENTRY_LOG")
                .unwrap_or_else(|_| "urlsentry=info,urlsentry_scoring=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "urlsentry starting");

    match args.command {
        cli::Command::Serve {
            host,
            port,
            timeout,
            engine,
        } => serve(host, port, timeout, engine).await,
        cli::Command::Score { url, engine } => score_url(url, engine).await,
        cli::Command::Info { engine } => show_info(engine).await,
    }
}

async fn serve(host: String, port: u16, timeout: u64, engine: cli::EngineArgs) -> Result<()> {
    let config = engine.to_config()?;
    let engine = Arc::new(ScoringEngine::new(config)?);

    // Heuristic scoring stays available even if no backend comes up.
    if !engine.load_backend(None).await {
        tracing::error!("failed to load model on startup");
    }

    let model = engine.model_info();
    tracing::info!(
        backend = %model.backend_name,
        device = %model.device,
        strategy = %engine.strategy(),
        "engine ready"
    );

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;
    let state = http::AppState {
        engine,
        settings: Arc::new(http::ServiceSettings {
            host,
            port,
            timeout,
        }),
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, http::build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;
    Ok(())
}

async fn score_url(url: String, engine: cli::EngineArgs) -> Result<()> {
    let config = engine.to_config()?;
    let engine = ScoringEngine::new(config)?;
    if engine.strategy() == StrategyKind::Model {
        engine.try_load_backend(None).await?;
    }

    let verdict = engine.score(&url)?;
    let output = serde_json::json!({
        "url": url,
        "strategy": engine.strategy(),
        "label": verdict.label(),
        "confidence": verdict.confidence(),
        "result": verdict,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn show_info(engine: cli::EngineArgs) -> Result<()> {
    let config = engine.to_config()?;
    let engine = ScoringEngine::new(config)?;
    if let Err(error) = engine.try_load_backend(None).await {
        tracing::warn!(error = %error, "backend unavailable");
    }
    println!("{}", serde_json::to_string_pretty(&engine.info())?);
    Ok(())
}
