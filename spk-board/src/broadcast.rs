//! SSE broadcaster for real-time client updates

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use spk_common::events::SpkEvent;

/// Manages client connections and event distribution
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<SpkEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster buffering up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast an event, ignoring if no clients are connected
    pub fn broadcast_lossy(&self, event: SpkEvent) {
        if let Ok(count) = self.tx.send(event) {
            debug!("Broadcast event to {} clients", count);
        }
    }

    /// Get current number of connected clients
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Create an SSE stream for a new client connection
    pub fn subscribe_stream(&self) -> impl Stream<Item = Result<Event, Infallible>> {
        let rx = self.tx.subscribe();
        let stream = BroadcastStream::new(rx);

        stream.filter_map(|result| async move {
            match result {
                Ok(event) => Event::default()
                    .event(event.event_name())
                    .json_data(&event)
                    .ok()
                    .map(Ok),
                Err(e) => {
                    // BroadcastStream wraps RecvError, just log and continue
                    warn!("SSE client error: {:?}", e);
                    None
                }
            }
        })
    }

    /// Create an Axum SSE response for GET /events.
    ///
    /// Clients get a connection event immediately so a subscriber arriving
    /// between reconciliation passes knows the stream is live before the
    /// first `StatusViewUpdated` lands.
    pub fn handle_sse_connection(&self) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        info!(
            "New SSE client connected, total clients: {}",
            self.client_count()
        );

        let hello = futures::stream::once(async {
            Ok::<Event, Infallible>(Event::default().event("ConnectionStatus").data("connected"))
        });

        Sse::new(hello.chain(self.subscribe_stream())).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(30))
                .text("keep-alive"),
        )
    }
}
