// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use juno::api::http::app_router;
use juno::cache::spawn_sweeper;
use juno::config::JunoConfig;
use juno::continuity;
use juno::llm::{CompletionModel, OpenAIClient};
use juno::state::create_app_state;

#[tokio::main]
async fn main() -> Result<()> {
    let config = JunoConfig::from_env();

    let level = config.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    info!("Starting Juno v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Models: {} (chat), {} (intent)",
        config.model, config.intent_model
    );
    if config.has_llm_key() {
        info!("✅ LLM API key configured");
    } else {
        warn!("⚠️ OPENAI_API_KEY not set; replies fall back to canned guidance");
    }

    let backend = continuity::connect(&config).await;
    let model: Arc<dyn CompletionModel> =
        Arc::new(OpenAIClient::new(&config).context("Failed to build LLM client")?);

    let state = create_app_state(config, model, backend);

    let sweeper = spawn_sweeper(
        state.sweep_targets(),
        Duration::from_secs(state.config.sweep_interval_secs),
    );

    let address = state.config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("🚀 Juno listening on http://{address}");

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    info!("Juno stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
