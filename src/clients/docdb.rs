//! Document-store client for usage records.
//!
//! Create-only: records are immutable once written, and this gateway never
//! reads them back. The store generates every document id — callers never
//! supply one.

use std::sync::Mutex;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::GatewayError;

#[derive(Debug)]
pub enum UsageStore {
    Http(HttpUsageStore),
    Memory(MemoryUsageStore),
}

impl UsageStore {
    /// Persist `doc` under a freshly generated id; returns the id.
    ///
    /// Any `id` field the caller put in the document is replaced.
    pub async fn create(&self, mut doc: Value) -> Result<String, GatewayError> {
        let id = Uuid::new_v4().to_string();
        doc["id"] = Value::String(id.clone());
        match self {
            UsageStore::Http(s) => s.create(&doc).await?,
            UsageStore::Memory(s) => s.create(doc),
        }
        Ok(id)
    }
}

// ── HTTP backend ──────────────────────────────────────────────────────────────

/// Adapter for a container-scoped document-creation endpoint.
#[derive(Debug)]
pub struct HttpUsageStore {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpUsageStore {
    pub fn new(
        endpoint: &str,
        database: &str,
        container: &str,
        api_key: Option<String>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        let url = format!(
            "{}/dbs/{database}/colls/{container}/docs",
            endpoint.trim_end_matches('/')
        );

        Ok(Self { client, url, api_key })
    }

    async fn create(&self, doc: &Value) -> Result<(), GatewayError> {
        let mut req = self.client.post(&self.url).json(doc);
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.url, error = %e, "usage write failed (transport)");
            GatewayError::Upstream(format!("usage log write failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream(format!(
                "usage store returned HTTP {status}: {body}"
            )));
        }

        debug!("usage record written");
        Ok(())
    }
}

// ── Memory backend ────────────────────────────────────────────────────────────

/// Offline usage backend — keeps records in process memory.
///
/// Used when no document DB is configured, and by tests asserting what was
/// (or was not) written.
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    records: Mutex<Vec<Value>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&self, doc: Value) {
        debug!(record = %doc, "usage record kept in memory");
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(doc);
    }

    /// Snapshot of everything written so far.
    pub fn records(&self) -> Vec<Value> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_assigns_a_fresh_id() {
        let store = UsageStore::Memory(MemoryUsageStore::new());
        let id = store.create(json!({ "user": "alice" })).await.unwrap();
        assert!(!id.is_empty());

        let UsageStore::Memory(mem) = &store else { unreachable!() };
        let records = mem.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], Value::String(id));
    }

    #[tokio::test]
    async fn caller_supplied_id_is_replaced() {
        let store = UsageStore::Memory(MemoryUsageStore::new());
        let id = store
            .create(json!({ "id": "smuggled", "user": "bob" }))
            .await
            .unwrap();
        assert_ne!(id, "smuggled");

        let UsageStore::Memory(mem) = &store else { unreachable!() };
        assert_ne!(mem.records()[0]["id"], Value::String("smuggled".into()));
    }
}
