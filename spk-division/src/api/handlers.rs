//! Endpoint handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Json;
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use spk_common::events::SpkEvent;
use spk_common::{Error, Stage};

use crate::api::ApiError;
use crate::ops::{self, QueueView};
use crate::AppState;

/// GET /health - liveness probe
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "spk-division",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Deserialize)]
pub struct DesignQueueQuery {
    #[serde(default = "default_view")]
    view: String,
}

fn default_view() -> String {
    "worklist".to_string()
}

/// GET /api/design-queue?view=worklist|revision
pub async fn get_design_queue(
    State(state): State<AppState>,
    Query(query): Query<DesignQueueQuery>,
) -> Result<Json<Value>, ApiError> {
    let view = QueueView::parse(&query.view).ok_or_else(|| {
        Error::InvalidInput(format!("unknown view '{}' (worklist|revision)", query.view))
    })?;

    let rows = ops::design_queue(&state.store, view).await?;
    Ok(Json(json!({ "total": rows.len(), "rows": rows })))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
    status: String,
    #[serde(default)]
    worksheet: Option<Value>,
    #[serde(default)]
    catatan: Option<String>,
}

/// POST /api/design-queue/{queue_id}/status
pub async fn set_queue_status(
    State(state): State<AppState>,
    Path(queue_id): Path<String>,
    Json(body): Json<SetStatusBody>,
) -> Result<Json<Value>, ApiError> {
    ops::set_queue_status(
        &state.store,
        &queue_id,
        &body.status,
        body.worksheet.as_ref(),
        body.catatan.as_deref(),
    )
    .await?;
    Ok(Json(json!({ "updated": true })))
}

#[derive(Debug, Default, Deserialize)]
pub struct FinishBody {
    #[serde(default)]
    worksheet: Option<Value>,
    #[serde(default)]
    catatan: Option<String>,
}

/// POST /api/design-queue/{queue_id}/finish
pub async fn finish_design(
    State(state): State<AppState>,
    Path(queue_id): Path<String>,
    body: Option<Json<FinishBody>>,
) -> Result<Json<Value>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let moved = ops::finish_design(
        &state.store,
        &queue_id,
        body.worksheet.as_ref(),
        body.catatan.as_deref(),
    )
    .await?;
    Ok(Json(json!({ "moved": moved })))
}

/// POST /api/pipeline/{spk_id}/complete/{stage}
pub async fn complete_stage(
    State(state): State<AppState>,
    Path((spk_id, stage)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let stage = Stage::from_path(&stage)
        .ok_or_else(|| Error::InvalidInput(format!("unknown stage '{stage}'")))?;

    let updated = ops::mark_stage_complete(&state.store, &spk_id, stage).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// POST /api/intake
pub async fn submit_intake(
    State(state): State<AppState>,
    Json(entry): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let saved = ops::submit_intake(&state.store, entry).await?;
    Ok((StatusCode::CREATED, Json(json!({ "entry": saved }))))
}

/// GET /events - SSE stream of collection-change notifications
///
/// Clients get a connection event up front, then a `CollectionChanged`
/// event for every write to the shared store, letting open screens refetch
/// the queue they display instead of polling.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to division events");

    let hello = futures::stream::once(async {
        Ok::<Event, Infallible>(Event::default().event("ConnectionStatus").data("connected"))
    });

    let changes = BroadcastStream::new(state.store.subscribe()).filter_map(|result| async move {
        let change = result.ok()?;
        let event = SpkEvent::CollectionChanged {
            key: change.key.to_string(),
            timestamp: chrono::Utc::now(),
        };
        Event::default()
            .event(event.event_name())
            .json_data(&event)
            .ok()
            .map(Ok)
    });

    Sse::new(hello.chain(changes)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
