//! SPK status board service entry point
//!
//! Reconciles the production collections into the merged progress view and
//! serves it on port 5710.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spk_board::remote::RemoteClient;
use spk_board::{build_router, reconciler, AppState};
use spk_common::store::LocalStore;
use spk_common::{config, migrate, store};

/// Command-line arguments for spk-board
#[derive(Parser, Debug)]
#[command(name = "spk-board")]
#[command(about = "SPK production status board service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5710", env = "SPK_BOARD_PORT")]
    port: u16,

    /// Root folder holding the shared database
    #[arg(short, long, env = config::ROOT_FOLDER_ENV)]
    root_folder: Option<String>,

    /// Base URL of the remote collection API (omit for local-only)
    #[arg(long, env = config::REMOTE_API_ENV)]
    remote_api: Option<String>,

    /// Interval between periodic reconciliation passes, in milliseconds
    #[arg(long, default_value = "2000")]
    refresh_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spk_board=debug,spk_common=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref());
    let db_path = config::database_path(&root_folder);
    info!("Starting SPK status board on port {}", args.port);
    info!("Database: {}", db_path.display());

    let pool = store::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    let local_store = LocalStore::new(pool);

    migrate::run_all_once(&local_store)
        .await
        .context("Failed to run data migrations")?;

    let remote = config::resolve_remote_api(args.remote_api.as_deref()).map(RemoteClient::new);
    match &remote {
        Some(client) => info!("Remote collection API: {}", client.base_url()),
        None => info!("No remote API configured, running local-only"),
    }

    let state = AppState::new(local_store, remote);

    // Warm up the view so the first request doesn't see an empty board
    if let Err(e) = state.refresh().await {
        warn!("Initial reconciliation pass failed: {}", e);
    }

    reconciler::spawn(
        state.clone(),
        Duration::from_millis(args.refresh_interval_ms),
    );

    let app = build_router(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
