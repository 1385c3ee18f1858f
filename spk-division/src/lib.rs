//! spk-division library - pre-production division work queues
//!
//! Serves the design worklist and revision views, accepts design-intake
//! submissions and stage-completion stamps, and performs the atomic
//! finish-design queue move. Shares the collection store with spk-board,
//! which picks up every write through the store change feed.

use axum::Router;
use tower_http::cors::CorsLayer;

use spk_common::store::LocalStore;

pub mod api;
pub mod ops;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Collection store (shared database with the board service)
    pub store: LocalStore,
}

impl AppState {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/health", get(api::health_check))
        .route("/api/design-queue", get(api::get_design_queue))
        .route("/api/design-queue/:queue_id/status", post(api::set_queue_status))
        .route("/api/design-queue/:queue_id/finish", post(api::finish_design))
        .route("/api/pipeline/:spk_id/complete/:stage", post(api::complete_stage))
        .route("/api/intake", post(api::submit_intake))
        .route("/events", get(api::event_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
