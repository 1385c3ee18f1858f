//! GET /events - SSE stream of status view updates

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// SSE connection handler; clients receive `StatusViewUpdated` events
/// whenever a reconciliation pass publishes a new view.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    state.broadcaster.handle_sse_connection()
}
