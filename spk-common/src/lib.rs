//! # SPK-Track Common Library
//!
//! Shared code for the SPK production-tracking services including:
//! - Collection store (SQLite-backed key/JSON-blob repository with change feed)
//! - Record schema adapter (legacy camelCase vs backend snake_case shapes)
//! - Reconciliation engine and merged status rows
//! - Production stage definitions and status derivation
//! - View filtering
//! - Event types for SSE
//! - Configuration loading
//! - Legacy-data migrations

pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod migrate;
pub mod models;
pub mod reconcile;
pub mod schema;
pub mod stage;
pub mod store;
pub mod time;

pub use error::{Error, Result};
pub use stage::Stage;
