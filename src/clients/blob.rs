//! Blob store client backing the content proxy.
//!
//! Properties come from a HEAD request so the size gate runs before any
//! bytes move; download buffers the whole object.

use std::collections::HashMap;

use reqwest::Client;
use tracing::{debug, error};

use crate::error::GatewayError;

/// Object metadata needed by the content proxy.
#[derive(Debug, Clone)]
pub struct BlobProperties {
    pub size: u64,
    /// Absent when the store has no content-type for the object.
    pub content_type: Option<String>,
}

// ── Store enum ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum BlobStore {
    Http(HttpBlobStore),
    Memory(MemoryBlobStore),
}

impl BlobStore {
    pub async fn properties(&self, path: &str) -> Result<BlobProperties, GatewayError> {
        match self {
            BlobStore::Http(s) => s.properties(path).await,
            BlobStore::Memory(s) => s.properties(path),
        }
    }

    /// Fetch the whole object into memory.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, GatewayError> {
        match self {
            BlobStore::Http(s) => s.download(path).await,
            BlobStore::Memory(s) => s.download(path),
        }
    }
}

// ── HTTP backend ──────────────────────────────────────────────────────────────

/// Adapter for a container-scoped blob endpoint.
#[derive(Debug)]
pub struct HttpBlobStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBlobStore {
    pub fn new(
        account: &str,
        container: &str,
        api_key: Option<String>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        let base_url = format!("https://{account}.blob.core.windows.net/{container}");

        Ok(Self { client, base_url, api_key })
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn properties(&self, path: &str) -> Result<BlobProperties, GatewayError> {
        let url = self.object_url(path);
        let mut req = self.client.head(&url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(%url, error = %e, "blob properties request failed (transport)");
            GatewayError::Upstream(e.to_string())
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound);
        }
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Upstream(format!(
                "blob store returned HTTP {status} for {path}"
            )));
        }

        let size = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                GatewayError::Upstream(format!("blob store sent no content length for {path}"))
            })?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        debug!(path, size, "blob properties fetched");
        Ok(BlobProperties { size, content_type })
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, GatewayError> {
        let url = self.object_url(path);
        let mut req = self.client.get(&url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(%url, error = %e, "blob download failed (transport)");
            GatewayError::Upstream(e.to_string())
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound);
        }
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Upstream(format!(
                "blob store returned HTTP {status} for {path}"
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            GatewayError::Upstream(format!("blob body read failed: {e}"))
        })?;

        Ok(bytes.to_vec())
    }
}

// ── Memory backend ────────────────────────────────────────────────────────────

/// Offline blob backend — objects seeded at construction.
///
/// Used when no storage account is configured, and by tests that need
/// exact sizes and content types.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: HashMap<String, MemoryObject>,
}

#[derive(Debug)]
struct MemoryObject {
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        path: impl Into<String>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) {
        self.objects.insert(
            path.into(),
            MemoryObject { content_type: content_type.map(str::to_string), bytes },
        );
    }

    fn properties(&self, path: &str) -> Result<BlobProperties, GatewayError> {
        let object = self.objects.get(path).ok_or(GatewayError::NotFound)?;
        Ok(BlobProperties {
            size: object.bytes.len() as u64,
            content_type: object.content_type.clone(),
        })
    }

    fn download(&self, path: &str) -> Result<Vec<u8>, GatewayError> {
        let object = self.objects.get(path).ok_or(GatewayError::NotFound)?;
        Ok(object.bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let mut store = MemoryBlobStore::new();
        store.insert("doc.pdf", Some("application/pdf"), vec![1, 2, 3]);
        let store = BlobStore::Memory(store);

        let props = store.properties("doc.pdf").await.unwrap();
        assert_eq!(props.size, 3);
        assert_eq!(props.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(store.download("doc.pdf").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn memory_store_missing_object_is_not_found() {
        let store = BlobStore::Memory(MemoryBlobStore::new());
        assert!(matches!(
            store.properties("absent.txt").await,
            Err(GatewayError::NotFound)
        ));
    }
}
