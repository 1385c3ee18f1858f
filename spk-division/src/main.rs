//! SPK division work-queue service entry point
//!
//! Serves the pre-production design queues on port 5711, writing to the
//! same collection store the status board reads from.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spk_common::store::LocalStore;
use spk_common::{config, migrate, store};
use spk_division::{build_router, AppState};

/// Command-line arguments for spk-division
#[derive(Parser, Debug)]
#[command(name = "spk-division")]
#[command(about = "SPK pre-production division work-queue service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5711", env = "SPK_DIVISION_PORT")]
    port: u16,

    /// Root folder holding the shared database
    #[arg(short, long, env = config::ROOT_FOLDER_ENV)]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spk_division=debug,spk_common=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref());
    let db_path = config::database_path(&root_folder);
    info!("Starting SPK division service on port {}", args.port);
    info!("Database: {}", db_path.display());

    let pool = store::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    let local_store = LocalStore::new(pool);

    migrate::run_all_once(&local_store)
        .await
        .context("Failed to run data migrations")?;

    let app = build_router(AppState::new(local_store));
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
