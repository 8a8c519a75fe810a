//! Search index query client.
//!
//! Supports text, vector and hybrid retrieval plus the semantic-ranker
//! options the docsearch approach exposes as overrides. Result documents
//! are mapped onto [`SearchHit`] through the configured field names, so an
//! index with different column naming only needs config changes.

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::error::GatewayError;

/// One retrieved chunk, already mapped to the configured fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub sourcepage: String,
    pub content: String,
}

/// Query parameters assembled by the docsearch approach.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Full-text query. `None` for pure vector retrieval.
    pub text: Option<String>,
    /// Query embedding. `None` for pure text retrieval.
    pub vector: Option<Vec<f32>>,
    pub top: usize,
    /// Category value to exclude from results.
    pub exclude_category: Option<String>,
    pub semantic_ranker: bool,
    pub semantic_captions: bool,
}

// ── Client enum ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SearchClient {
    Http(HttpSearchClient),
    Null(NullSearchClient),
}

impl SearchClient {
    pub async fn query(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, GatewayError> {
        match self {
            SearchClient::Http(c) => c.query(query).await,
            SearchClient::Null(c) => c.query(query).await,
        }
    }
}

// ── HTTP backend ──────────────────────────────────────────────────────────────

/// Adapter for the index's REST query endpoint.
#[derive(Debug)]
pub struct HttpSearchClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    content_field: String,
    sourcepage_field: String,
}

impl HttpSearchClient {
    pub fn new(
        service: &str,
        index: &str,
        api_version: &str,
        api_key: Option<String>,
        content_field: String,
        sourcepage_field: String,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!(
            "https://{service}.search.windows.net/indexes/{index}/docs/search?api-version={api_version}"
        );

        Ok(Self { client, endpoint, api_key, content_field, sourcepage_field })
    }

    async fn query(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, GatewayError> {
        let body = build_body(query);

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.endpoint, error = %e, "search request failed (transport)");
            GatewayError::Upstream(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream(format!(
                "search returned HTTP {status}: {text}"
            )));
        }

        let parsed = response.json::<Value>().await.map_err(|e| {
            GatewayError::Upstream(format!("failed to parse search body: {e}"))
        })?;

        let hits = parse_hits(
            &parsed,
            &self.content_field,
            &self.sourcepage_field,
            query.semantic_captions,
        );
        debug!(hits = hits.len(), "search query returned");
        Ok(hits)
    }
}

// ── Null backend ──────────────────────────────────────────────────────────────

/// Offline search backend — always zero hits, so the docsearch approach
/// degrades to an unsourced answer instead of failing.
#[derive(Debug, Default)]
pub struct NullSearchClient;

impl NullSearchClient {
    async fn query(&self, _query: &SearchQuery) -> Result<Vec<SearchHit>, GatewayError> {
        debug!("null search client returning no hits");
        Ok(Vec::new())
    }
}

// ── Wire assembly ─────────────────────────────────────────────────────────────

/// Build the REST query body from the parameter set.
fn build_body(query: &SearchQuery) -> Value {
    let mut body = json!({ "top": query.top });

    if let Some(text) = &query.text {
        body["search"] = json!(text);
    }
    if let Some(category) = &query.exclude_category {
        // Single quotes double up inside OData string literals.
        let escaped = category.replace('\'', "''");
        body["filter"] = json!(format!("category ne '{escaped}'"));
    }
    if query.semantic_ranker {
        body["queryType"] = json!("semantic");
        body["queryLanguage"] = json!("en-us");
        body["semanticConfiguration"] = json!("default");
    }
    if query.semantic_captions {
        body["captions"] = json!("extractive");
    }
    if let Some(vector) = &query.vector {
        body["vectors"] = json!([{
            "value": vector,
            "fields": "embedding",
            "k": query.top,
        }]);
    }

    body
}

/// Map the response documents onto [`SearchHit`]s.
///
/// With captions enabled, caption text replaces the content field when the
/// service supplied any.
fn parse_hits(
    response: &Value,
    content_field: &str,
    sourcepage_field: &str,
    use_captions: bool,
) -> Vec<SearchHit> {
    let Some(docs) = response.get("value").and_then(Value::as_array) else {
        return Vec::new();
    };

    docs.iter()
        .map(|doc| {
            let content = if use_captions
                && let Some(captions) = doc.get("@search.captions").and_then(Value::as_array)
                && !captions.is_empty()
            {
                captions
                    .iter()
                    .filter_map(|c| c.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(" . ")
            } else {
                doc.get(content_field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };

            let sourcepage = doc
                .get(sourcepage_field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            SearchHit { sourcepage, content }
        })
        .collect()
}
