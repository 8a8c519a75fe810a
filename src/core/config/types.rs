//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs the service consumes.
//! Raw TOML deserialization types live in `raw.rs`.

use std::path::PathBuf;

// ── HTTP server ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the listener to.
    pub bind: String,
    /// Directory holding the entry page, favicon and `assets/` tree.
    pub static_dir: PathBuf,
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Request header carrying the edge-validated identity token.
    pub identity_header: String,
    /// Credential provider token endpoint. Empty = static dev credential.
    pub token_url: String,
    /// Resource scope requested from the credential provider.
    pub token_scope: String,
}

// ── Blob storage ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage account name. Empty = in-memory store (offline dev).
    pub account: String,
    /// Container holding the content files.
    pub container: String,
    /// Access key from `NELUM_STORAGE_API_KEY` env — never sourced from TOML.
    pub api_key: Option<String>,
}

// ── Search index ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Search service name. Empty = null client returning no hits.
    pub service: String,
    /// Index queried by the retrieve-then-read approach.
    pub index: String,
    /// REST api-version sent with every query.
    pub api_version: String,
    /// Index field holding the chunk text.
    pub content_field: String,
    /// Index field holding the source page reference.
    pub sourcepage_field: String,
    /// API key from `NELUM_SEARCH_API_KEY` env — never sourced from TOML.
    pub api_key: Option<String>,
}

// ── Completion service ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Completion service name. Empty = dummy echo client (offline dev).
    pub service: String,
    /// Deployment used for chat completions.
    pub chat_deployment: String,
    /// Deployment used for query embeddings.
    pub embedding_deployment: String,
    /// REST api-version sent with every call.
    pub api_version: String,
    /// Default sampling temperature (approach overrides may replace it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

// ── Usage log store ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UsageConfig {
    /// Document DB endpoint URL. Empty = in-memory store (offline dev).
    pub endpoint: String,
    /// Database id holding the usage container.
    pub database: String,
    /// Container the usage records are written to.
    pub container: String,
    /// API key from `NELUM_USAGE_API_KEY` env — never sourced from TOML.
    pub api_key: Option<String>,
}

// ── Telemetry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Collector connection string. When set, log output switches to the
    /// JSON event format so an external exporter can ingest it.
    pub connection: Option<String>,
}

// ── Config (root) ────────────────────────────────────────────────────────────

/// Fully-resolved gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub completion: CompletionConfig,
    pub usage: UsageConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Returns `true` when structured telemetry output is requested.
    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry
            .connection
            .as_deref()
            .is_some_and(|c| !c.is_empty())
    }
}
