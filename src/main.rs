//! Propfeed service binary
//!
//! Parses CLI flags into a [`Config`], spawns the refresh scheduler, and
//! serves the HTTP API until Ctrl-C, then shuts the scheduler down cleanly.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use propfeed::api::{build_router, AppState};
use propfeed::cli::Cli;
use propfeed::config::Config;
use propfeed::query::QueryEngine;
use propfeed::scheduler::RefreshScheduler;
use propfeed::snapshot::SnapshotStore;
use propfeed::upstream::UpstreamClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_cli(&cli)?;

    let store = Arc::new(SnapshotStore::new());
    let client = UpstreamClient::new(config.base_url.clone(), config.fetch_timeout);
    let scheduler = RefreshScheduler::spawn(client, Arc::clone(&store), &config);

    let state = AppState {
        query: QueryEngine::new(Arc::clone(&store)),
        scheduler: scheduler.handle(),
    };
    let router = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, upstream = %config.base_url, "propfeed listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    scheduler.shutdown().await;

    Ok(())
}
