//! corpus-server - Corpus orchestrator server
//!
//! REST API over the pipeline engine, with background capability probing.

use clap::Parser;
use corpus_core::Engine;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod config;
mod routes;
mod services;
mod state;

use cli::Cli;
use config::Config;
use services::ProbeService;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("corpus_server=info".parse()?)
                .add_directive("corpus_core=info".parse()?),
        )
        .init();

    info!("corpus-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?.with_overrides(cli.host, cli.port);
    let addr = config.bind_addr();
    let probe_interval = config.server.probe_interval_secs;

    let engine = Engine::new(config.engine.clone())?;
    let state = AppState::new(config, engine);

    let probing = ProbeService::new(Arc::clone(&state.engine));
    if probe_interval > 0 {
        probing.start(Duration::from_secs(probe_interval)).await;
    } else {
        info!("Background probing disabled");
    }

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, routes::create_router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    probing.stop().await;
    let stopped = state.engine.cleanup_all().await;
    info!(stopped, "Pipelines stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
