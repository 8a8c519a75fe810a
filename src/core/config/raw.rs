//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape — serde target before resolution.
#[derive(Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub gateway: RawGateway,
    #[serde(default)]
    pub server: RawServer,
    #[serde(default)]
    pub auth: RawAuth,
    #[serde(default)]
    pub storage: RawStorage,
    #[serde(default)]
    pub search: RawSearch,
    #[serde(default)]
    pub completion: RawCompletion,
    #[serde(default)]
    pub usage: RawUsage,
    #[serde(default)]
    pub telemetry: RawTelemetry,
}

#[derive(Deserialize)]
pub(super) struct RawGateway {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RawGateway {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

// ── Server ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawServer {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for RawServer {
    fn default() -> Self {
        Self { bind: default_bind(), static_dir: default_static_dir() }
    }
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawAuth {
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
    #[serde(default)]
    pub token_url: String,
    #[serde(default)]
    pub token_scope: String,
}

impl Default for RawAuth {
    fn default() -> Self {
        Self {
            identity_header: default_identity_header(),
            token_url: String::new(),
            token_scope: String::new(),
        }
    }
}

// ── Storage ──────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub(super) struct RawStorage {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub container: String,
}

// ── Search ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawSearch {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub index: String,
    #[serde(default = "default_search_api_version")]
    pub api_version: String,
    #[serde(default = "default_content_field")]
    pub content_field: String,
    #[serde(default = "default_sourcepage_field")]
    pub sourcepage_field: String,
}

impl Default for RawSearch {
    fn default() -> Self {
        Self {
            service: String::new(),
            index: String::new(),
            api_version: default_search_api_version(),
            content_field: default_content_field(),
            sourcepage_field: default_sourcepage_field(),
        }
    }
}

// ── Completion ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawCompletion {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub chat_deployment: String,
    #[serde(default)]
    pub embedding_deployment: String,
    #[serde(default = "default_completion_api_version")]
    pub api_version: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawCompletion {
    fn default() -> Self {
        Self {
            service: String::new(),
            chat_deployment: String::new(),
            embedding_deployment: String::new(),
            api_version: default_completion_api_version(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

// ── Usage ────────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub(super) struct RawUsage {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub container: String,
}

// ── Telemetry ────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub(super) struct RawTelemetry {
    #[serde(default)]
    pub connection: Option<String>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_identity_header() -> String {
    "x-identity-token".to_string()
}

fn default_search_api_version() -> String {
    "2023-07-01-Preview".to_string()
}

fn default_content_field() -> String {
    "content".to_string()
}

fn default_sourcepage_field() -> String {
    "sourcepage".to_string()
}

fn default_completion_api_version() -> String {
    "2023-05-15".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout_seconds() -> u64 {
    60
}
