//! Embeddings client for the managed completion service.
//!
//! Same service as `completion`, different deployment path. Used by the
//! retrieve-then-read approach for vector and hybrid retrieval.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::auth::TokenCell;
use crate::error::GatewayError;

#[derive(Debug)]
pub enum EmbeddingClient {
    Http(HttpEmbeddingClient),
    Dummy(DummyEmbeddingClient),
}

impl EmbeddingClient {
    /// Embed a single query string.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, GatewayError> {
        match self {
            EmbeddingClient::Http(c) => c.embed(input).await,
            EmbeddingClient::Dummy(c) => c.embed(input).await,
        }
    }
}

/// Adapter for a deployment-scoped `/embeddings` endpoint.
#[derive(Debug)]
pub struct HttpEmbeddingClient {
    client: Client,
    endpoint: String,
    token: Arc<TokenCell>,
}

impl HttpEmbeddingClient {
    pub fn new(
        service: &str,
        deployment: &str,
        api_version: &str,
        timeout_seconds: u64,
        token: Arc<TokenCell>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!(
            "https://{service}.openai.azure.com/openai/deployments/{deployment}/embeddings?api-version={api_version}"
        );

        Ok(Self { client, endpoint, token })
    }

    async fn embed(&self, input: &str) -> Result<Vec<f32>, GatewayError> {
        let payload = EmbeddingRequest { input: [input] };

        let bearer = self.token.bearer().await;
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(bearer)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.endpoint, error = %e, "embedding request failed (transport)");
                GatewayError::Upstream(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream(format!(
                "embedding request returned HTTP {status}: {body}"
            )));
        }

        let parsed = response.json::<EmbeddingResponse>().await.map_err(|e| {
            GatewayError::Upstream(format!("failed to parse embedding body: {e}"))
        })?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| GatewayError::Upstream("empty embedding response".into()))?;

        debug!(dimensions = vector.len(), "received embedding");
        Ok(vector)
    }
}

/// Offline embedding backend — a fixed short vector.
#[derive(Debug, Default)]
pub struct DummyEmbeddingClient;

impl DummyEmbeddingClient {
    async fn embed(&self, _input: &str) -> Result<Vec<f32>, GatewayError> {
        Ok(vec![0.0, 0.0, 0.0, 0.0])
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dummy_returns_fixed_vector() {
        let c = DummyEmbeddingClient;
        assert_eq!(c.embed("anything").await.unwrap().len(), 4);
    }
}
