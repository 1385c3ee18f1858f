//! Background reconciliation task
//!
//! Rebuilds the merged status view whenever a watched collection changes
//! (with a trailing debounce to coalesce bursts) and on a periodic refresh
//! tick that picks up remote-side changes invisible to the local change
//! feed. Each pass is a pure computation over materialized collections;
//! nothing here mutates the source stores.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use spk_common::events::SpkEvent;
use spk_common::models::StatusRow;
use spk_common::reconcile::{reconcile, Lookups};
use spk_common::store::{keys, LocalStore, WATCHED_KEYS};
use spk_common::Result;

use crate::remote::{RemoteClient, RemoteSources};
use crate::AppState;

/// Quiet period after a store change before a pass runs
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Run one full reconciliation pass: load sources (remote first, local
/// fallback), build lookups, merge.
pub async fn run_pass(store: &LocalStore, remote: Option<&RemoteClient>) -> Result<Vec<StatusRow>> {
    let sources = load_sources(store, remote).await;

    // Auxiliary maps are always local; the division screens own them
    let recap_map = store.read_object(keys::PRODUCTION_RECAP_MAP).await?;
    let terbit_map = store.read_object(keys::TERBIT_MAP).await?;

    let lookups = Lookups::build(&sources.rekap_bordir, &sources.design_intake);
    Ok(reconcile(
        &sources.order_queue,
        &sources.pipeline,
        &lookups,
        &recap_map,
        &terbit_map,
    ))
}

/// Load the four source collections, remote first when configured.
///
/// A remote failure abandons the whole remote set for this pass; local keys
/// are then read independently so one bad key cannot blank the others.
async fn load_sources(store: &LocalStore, remote: Option<&RemoteClient>) -> RemoteSources {
    if let Some(client) = remote {
        match client.fetch_sources().await {
            Ok(sources) => return sources,
            Err(e) => warn!("remote fetch failed, falling back to local store: {e}"),
        }
    }
    RemoteSources {
        pipeline: read_or_empty(store, keys::PIPELINE).await,
        rekap_bordir: read_or_empty(store, keys::REKAP_BORDIR).await,
        order_queue: read_or_empty(store, keys::ORDER_QUEUE).await,
        design_intake: read_or_empty(store, keys::DESIGN_INTAKE).await,
    }
}

async fn read_or_empty(store: &LocalStore, key: &str) -> Vec<serde_json::Value> {
    match store.read_list(key).await {
        Ok(list) => list,
        Err(e) => {
            warn!(key, "local read failed: {e}");
            Vec::new()
        }
    }
}

/// Spawn the reconciler loop.
///
/// Triggers: the store change feed (debounced) and `refresh_interval`.
pub fn spawn(state: AppState, refresh_interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut changes = state.store.subscribe();
        let mut tick = tokio::time::interval(refresh_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                change = changes.recv() => {
                    match change {
                        Ok(c) if WATCHED_KEYS.contains(&c.key) => {
                            debug!(key = c.key, "collection changed, debouncing");
                            state.broadcaster.broadcast_lossy(SpkEvent::CollectionChanged {
                                key: c.key.to_string(),
                                timestamp: chrono::Utc::now(),
                            });
                            // Trailing debounce: wait for the burst to settle
                            while tokio::time::timeout(DEBOUNCE, changes.recv())
                                .await
                                .map(|r| r.is_ok())
                                .unwrap_or(false)
                            {}
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "change feed lagged, refreshing");
                        }
                        Err(RecvError::Closed) => {
                            // Store dropped; fall back to interval cadence
                            tokio::time::sleep(refresh_interval).await;
                        }
                    }
                }
            }

            if let Err(e) = state.refresh().await {
                warn!("reconciliation pass failed: {e}");
            }
        }
    })
}
