//! spk-board library - SPK On Progress status board
//!
//! Merges the order queue, pipeline, bordir-recap log and design-intake log
//! into one progress view, keeps it fresh through the store change feed, and
//! serves it over HTTP with SSE refresh notifications.

use std::sync::Arc;

use axum::Router;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use spk_common::events::SpkEvent;
use spk_common::models::StatusRow;
use spk_common::store::LocalStore;

pub mod api;
pub mod broadcast;
pub mod reconciler;
pub mod remote;

use broadcast::EventBroadcaster;
use remote::RemoteClient;

/// Application state shared across HTTP handlers and the reconciler task
#[derive(Clone)]
pub struct AppState {
    /// Collection store (shared database with the division services)
    pub store: LocalStore,
    /// Remote collection endpoints; `None` runs local-only
    pub remote: Option<RemoteClient>,
    /// SSE event fan-out
    pub broadcaster: EventBroadcaster,
    view_tx: watch::Sender<Arc<Vec<StatusRow>>>,
    view_rx: watch::Receiver<Arc<Vec<StatusRow>>>,
}

impl AppState {
    /// Create new application state with an empty status view
    pub fn new(store: LocalStore, remote: Option<RemoteClient>) -> Self {
        let (view_tx, view_rx) = watch::channel(Arc::new(Vec::new()));
        Self {
            store,
            remote,
            broadcaster: EventBroadcaster::new(100),
            view_tx,
            view_rx,
        }
    }

    /// Latest merged status rows
    pub fn rows(&self) -> Arc<Vec<StatusRow>> {
        self.view_rx.borrow().clone()
    }

    /// Run one reconciliation pass and publish the result.
    ///
    /// Returns the row count. Used by the reconciler task and callable
    /// directly (tests, startup warm-up).
    pub async fn refresh(&self) -> spk_common::Result<usize> {
        let rows = reconciler::run_pass(&self.store, self.remote.as_ref()).await?;
        let count = rows.len();
        self.view_tx.send_replace(Arc::new(rows));
        self.broadcaster.broadcast_lossy(SpkEvent::StatusViewUpdated {
            row_count: count,
            timestamp: chrono::Utc::now(),
        });
        Ok(count)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/health", get(api::health_check))
        .route("/api/status", get(api::get_status_rows))
        .route("/api/status/options", get(api::get_status_options))
        .route("/events", get(api::event_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
