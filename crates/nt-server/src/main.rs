//! notionera server -- HTTP API over the shared lecture roster plus the
//! background worker that syncs it into each user's Notion workspace.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use nt_core::config::{Config, EnvCredentialProvider};
use nt_notion::RetryPolicy;
use nt_sync::NotionWorkspaceFactory;

mod http_api;
mod state;
mod telemetry;
mod worker;

use state::AppState;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    match std::env::var("NOTIONERA_LOG_FORMAT").as_deref() {
        Ok("json") => telemetry::init_logging_json("notionera", "info"),
        _ => telemetry::init_logging("notionera", "info"),
    }

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        Config::default()
    });

    let credentials = Arc::new(EnvCredentialProvider::new(&config.notion));
    let workspaces = Arc::new(NotionWorkspaceFactory::new(
        &config.notion.api_base,
        &config.notion.api_version,
        RetryPolicy {
            max_attempts: config.sync.retry_max_attempts,
            base_delay: Duration::from_millis(config.sync.retry_base_delay_ms),
        },
    ));

    let (queue_tx, queue_rx) = flume::unbounded();
    let state = Arc::new(AppState::new(config, queue_tx));

    worker::spawn_progress_logger(&state.progress);
    worker::spawn_sync_worker(state.clone(), credentials, workspaces, queue_rx);

    let addr = format!("{}:{}", state.config.server.bind, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "API server listening");

    let app = http_api::api_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    info!("shutdown signal received");
}
