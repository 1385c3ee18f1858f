//! Merged status view endpoints

use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use spk_common::filter::{filter_rows, status_options};
use spk_common::models::StatusRow;
use spk_common::stage::derive_status;

use crate::AppState;

/// Query parameters for GET /api/status
#[derive(Debug, Deserialize, Default)]
pub struct StatusQuery {
    /// Case-insensitive substring match over all text fields
    #[serde(default)]
    pub search: String,
    /// Exact match against the derived status label
    #[serde(default)]
    pub status: String,
}

/// A status row with its derived progress label attached
#[derive(Debug, Serialize)]
pub struct StatusRowView {
    #[serde(flatten)]
    pub row: StatusRow,
    pub status_pesanan: String,
}

impl From<StatusRow> for StatusRowView {
    fn from(row: StatusRow) -> Self {
        let status_pesanan = derive_status(&row);
        Self { row, status_pesanan }
    }
}

/// GET /api/status - merged, filtered progress rows
pub async fn get_status_rows(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Json<serde_json::Value> {
    let rows = state.rows();
    let filtered = filter_rows(&rows, &query.search, &query.status);
    let views: Vec<StatusRowView> = filtered.into_iter().map(StatusRowView::from).collect();

    Json(json!({
        "total": views.len(),
        "rows": views,
    }))
}

/// GET /api/status/options - distinct derived status labels, first-seen order
pub async fn get_status_options(State(state): State<AppState>) -> Json<serde_json::Value> {
    let rows = state.rows();
    Json(json!({ "options": status_options(&rows) }))
}
