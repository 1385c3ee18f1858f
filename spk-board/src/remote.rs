//! Remote collection endpoints
//!
//! One GET per collection against the backend API. A reconciliation pass
//! fetches all four sources concurrently; if any request fails the whole
//! set is abandoned and the pass falls back to the local store. No retry,
//! no backoff; the next pass simply tries remote again.

use serde_json::Value;
use tracing::debug;

use spk_common::{Error, Result};

/// The four remote source collections, fetched together each pass
#[derive(Debug, Default)]
pub struct RemoteSources {
    pub pipeline: Vec<Value>,
    pub rekap_bordir: Vec<Value>,
    pub order_queue: Vec<Value>,
    pub design_intake: Vec<Value>,
}

/// Client for the remote collection endpoints
#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Base URL the client was configured with
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch all four source collections concurrently, in the fixed order
    /// pipeline, bordir-recap, order-queue, design-intake. Fails as a whole
    /// when any member fails.
    pub async fn fetch_sources(&self) -> Result<RemoteSources> {
        let (pipeline, rekap_bordir, order_queue, design_intake) = tokio::try_join!(
            self.get_collection("/api/spk/pipeline"),
            self.get_collection("/api/spk/rekap-bordir"),
            self.get_collection("/api/spk/plotting-queue"),
            self.get_collection("/api/spk/design-intake"),
        )?;
        debug!(
            pipeline = pipeline.len(),
            rekap = rekap_bordir.len(),
            queue = order_queue.len(),
            intake = design_intake.len(),
            "fetched remote sources"
        );
        Ok(RemoteSources {
            pipeline,
            rekap_bordir,
            order_queue,
            design_intake,
        })
    }

    async fn get_collection(&self, path: &str) -> Result<Vec<Value>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("GET {url}: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Remote(format!("GET {url}: {e}")))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("GET {url}: invalid JSON: {e}")))?;
        match body {
            Value::Array(list) => Ok(list),
            _ => Err(Error::Remote(format!("GET {url}: expected an array"))),
        }
    }
}
