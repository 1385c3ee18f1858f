//! Collection store
//!
//! The system of record is a set of named JSON collections (lists and maps)
//! persisted one-blob-per-key in a single SQLite table, written by the
//! division screens and read by the reconciliation engine. Reads are
//! defensive: a missing key, malformed JSON, or a value of the wrong shape
//! all yield an empty collection rather than an error.
//!
//! Every successful write emits a [`StoreChange`] on a broadcast channel,
//! the change feed that downstream consumers (the board reconciler)
//! subscribe to instead of polling.

use serde_json::{Map, Value};
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::debug;

use crate::Result;

mod init;
pub use init::init_database;

/// Collection key names, unchanged from the legacy storage layout
pub mod keys {
    /// Order queue (orders awaiting pipeline progress)
    pub const ORDER_QUEUE: &str = "plotting_rekap_bordir_queue";
    /// Pipeline entries with stage-completion timestamps
    pub const PIPELINE: &str = "spk_pipeline";
    /// Bordir-recap batch log
    pub const REKAP_BORDIR: &str = "method_rekap_bordir";
    /// Design-intake log (earliest record of an order)
    pub const DESIGN_INTAKE: &str = "antrian_input_desain";
    /// SPK id -> recap-production id
    pub const PRODUCTION_RECAP_MAP: &str = "production_recap_map";
    /// SPK id -> SPK issuance date
    pub const TERBIT_MAP: &str = "spk_terbit_map";
    /// Pre-production design work queue
    pub const DESIGN_QUEUE: &str = "design_queue";
    /// Finished designs awaiting validation
    pub const DESIGN_DONE_QUEUE: &str = "antrian_pengerjaan_desain";
    /// One-shot migration flag
    pub const MIGRATIONS_FLAG: &str = "migrations_ran_v1";
}

/// Keys whose content feeds the status-view reconciliation
pub const WATCHED_KEYS: [&str; 6] = [
    keys::ORDER_QUEUE,
    keys::PIPELINE,
    keys::REKAP_BORDIR,
    keys::DESIGN_INTAKE,
    keys::PRODUCTION_RECAP_MAP,
    keys::TERBIT_MAP,
];

/// A write notification for one collection key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChange {
    pub key: &'static str,
}

/// SQLite-backed collection store with a change feed
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
    changes: broadcast::Sender<StoreChange>,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self { pool, changes }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Subscribe to write notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Emit a change notification; lossy when nobody is listening
    pub fn notify(&self, key: &'static str) {
        let _ = self.changes.send(StoreChange { key });
    }

    /// Raw blob for a key, if present
    pub async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM collections WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(v,)| v))
    }

    /// Write a raw blob (used for flag keys)
    pub async fn write_raw(&self, key: &'static str, value: &str) -> Result<()> {
        upsert(&self.pool, key, value).await?;
        self.notify(key);
        Ok(())
    }

    /// Read a list collection. Missing key, malformed JSON, or a non-array
    /// value all yield an empty list.
    pub async fn read_list(&self, key: &str) -> Result<Vec<Value>> {
        Ok(parse_list(key, self.read_raw(key).await?))
    }

    /// Read a map collection with the same defensive semantics
    pub async fn read_object(&self, key: &str) -> Result<Map<String, Value>> {
        let raw = self.read_raw(key).await?;
        let parsed = raw.and_then(|s| match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) | Err(_) => {
                debug!(key, "ignoring malformed map collection");
                None
            }
        });
        Ok(parsed.unwrap_or_default())
    }

    /// Persist a list collection and notify subscribers
    pub async fn write_list(&self, key: &'static str, values: &[Value]) -> Result<()> {
        let blob = serde_json::to_string(values)
            .map_err(|e| crate::Error::Internal(format!("serialize {key}: {e}")))?;
        upsert(&self.pool, key, &blob).await?;
        self.notify(key);
        Ok(())
    }

    /// Persist a map collection and notify subscribers
    pub async fn write_object(&self, key: &'static str, map: &Map<String, Value>) -> Result<()> {
        let blob = serde_json::to_string(map)
            .map_err(|e| crate::Error::Internal(format!("serialize {key}: {e}")))?;
        upsert(&self.pool, key, &blob).await?;
        self.notify(key);
        Ok(())
    }

    /// Begin a transaction for multi-key atomic operations. The caller is
    /// responsible for emitting [`notify`](Self::notify) after commit.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Sqlite>> {
        Ok(self.pool.begin().await?)
    }
}

/// Transactional list read (same defensive parse as [`LocalStore::read_list`])
pub async fn read_list_tx(conn: &mut SqliteConnection, key: &str) -> Result<Vec<Value>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM collections WHERE key = ?")
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(parse_list(key, row.map(|(v,)| v)))
}

/// Transactional list write
pub async fn write_list_tx(
    conn: &mut SqliteConnection,
    key: &str,
    values: &[Value],
) -> Result<()> {
    let blob = serde_json::to_string(values)
        .map_err(|e| crate::Error::Internal(format!("serialize {key}: {e}")))?;
    sqlx::query(
        "INSERT INTO collections (key, value, updated_at) VALUES (?, ?, datetime('now')) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(blob)
    .execute(conn)
    .await?;
    Ok(())
}

async fn upsert(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO collections (key, value, updated_at) VALUES (?, ?, datetime('now')) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

fn parse_list(key: &str, raw: Option<String>) -> Vec<Value> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(list)) => list,
        Ok(_) | Err(_) => {
            debug!(key, "ignoring malformed list collection");
            Vec::new()
        }
    }
}
