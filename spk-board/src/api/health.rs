//! Health check endpoint

use axum::response::Json;
use serde_json::json;

/// GET /health - liveness probe
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "spk-board",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
