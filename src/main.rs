// ABOUTME: Entry point for the sovereign-hub binary.
// ABOUTME: Parses CLI arguments, initializes tracing, replays the event log, and starts the HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sovereign_server::{AppState, HubConfig, create_router};

/// Session-tracking hub: durable JSONL event log with a live artwork view.
#[derive(Debug, Parser)]
#[command(name = "sovereign-hub", version, about)]
struct Cli {
    /// Address to listen on (overrides SOVEREIGN_BIND).
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Event log file (overrides SOVEREIGN_LOG_FILE).
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "sovereign_hub=info,sovereign_core=info,sovereign_store=info,sovereign_server=info,tower_http=debug",
                )
            }),
        )
        .init();

    let cli = Cli::parse();

    let mut config = HubConfig::from_env().context("invalid configuration")?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(log_file) = cli.log_file {
        config.log_file = log_file;
    }
    config.validate().context("invalid configuration")?;

    tracing::info!(log_file = %config.log_file.display(), "sovereign-hub starting up");

    let hub = sovereign_store::start(&config.log_file)
        .with_context(|| format!("failed to open event log {}", config.log_file.display()))?;
    let state = Arc::new(AppState::new(hub));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("sovereign-hub stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
