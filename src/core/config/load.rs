//! Configuration loading with env-var overrides.
//!
//! Reads a TOML file and applies `NELUM_*` env overrides on top. Service
//! API keys are env-only — they are never read from TOML so config files
//! stay safe to commit.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::GatewayError;

use super::raw::RawConfig;
use super::types::*;

/// Env-sourced override set.
///
/// Collected once from the process environment in [`load`]; tests construct
/// it directly instead of mutating env vars.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub log_level: Option<String>,
    pub bind: Option<String>,
    pub storage_account: Option<String>,
    pub storage_container: Option<String>,
    pub search_service: Option<String>,
    pub search_index: Option<String>,
    pub completion_service: Option<String>,
    pub chat_deployment: Option<String>,
    pub embedding_deployment: Option<String>,
    pub kb_field_content: Option<String>,
    pub kb_field_sourcepage: Option<String>,
    pub usage_endpoint: Option<String>,
    pub usage_database: Option<String>,
    pub usage_container: Option<String>,
    pub telemetry_connection: Option<String>,
    pub storage_api_key: Option<String>,
    pub search_api_key: Option<String>,
    pub usage_api_key: Option<String>,
}

impl EnvOverrides {
    /// Read every recognised `NELUM_*` variable from the environment.
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            log_level: var("NELUM_LOG_LEVEL"),
            bind: var("NELUM_BIND"),
            storage_account: var("NELUM_STORAGE_ACCOUNT"),
            storage_container: var("NELUM_STORAGE_CONTAINER"),
            search_service: var("NELUM_SEARCH_SERVICE"),
            search_index: var("NELUM_SEARCH_INDEX"),
            completion_service: var("NELUM_COMPLETION_SERVICE"),
            chat_deployment: var("NELUM_CHAT_DEPLOYMENT"),
            embedding_deployment: var("NELUM_EMBEDDING_DEPLOYMENT"),
            kb_field_content: var("NELUM_KB_FIELD_CONTENT"),
            kb_field_sourcepage: var("NELUM_KB_FIELD_SOURCEPAGE"),
            usage_endpoint: var("NELUM_USAGE_ENDPOINT"),
            usage_database: var("NELUM_USAGE_DATABASE"),
            usage_container: var("NELUM_USAGE_CONTAINER"),
            telemetry_connection: var("NELUM_TELEMETRY_CONNECTION"),
            storage_api_key: var("NELUM_STORAGE_API_KEY"),
            search_api_key: var("NELUM_SEARCH_API_KEY"),
            usage_api_key: var("NELUM_USAGE_API_KEY"),
        }
    }
}

/// Load config from the given path, or `config/default.toml`, then apply
/// env-var overrides. If no path is given and `config/default.toml` does not
/// exist, resolution starts from built-in defaults.
pub fn load(config_path: Option<&str>) -> Result<Config, GatewayError> {
    let overrides = EnvOverrides::from_env();

    if let Some(path) = config_path {
        return load_from(Path::new(path), &overrides);
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(default_path, &overrides)
    } else {
        Ok(resolve(RawConfig::default(), &overrides))
    }
}

/// Internal loader — accepts an explicit path and an override set.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &EnvOverrides) -> Result<Config, GatewayError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| GatewayError::Config(format!("cannot read {}: {e}", path.display())))?;

    let value: toml::Value = toml::from_str(&raw)
        .map_err(|e| GatewayError::Config(format!("parse error in {}: {e}", path.display())))?;

    let parsed: RawConfig = Deserialize::deserialize(value)
        .map_err(|e: toml::de::Error| {
            GatewayError::Config(format!("config error in {}: {e}", path.display()))
        })?;

    Ok(resolve(parsed, overrides))
}

/// Apply overrides onto the raw shapes and produce the resolved config.
fn resolve(parsed: RawConfig, ov: &EnvOverrides) -> Config {
    let pick = |ov: &Option<String>, raw: String| ov.clone().unwrap_or(raw);

    Config {
        log_level: pick(&ov.log_level, parsed.gateway.log_level),
        server: ServerConfig {
            bind: pick(&ov.bind, parsed.server.bind),
            static_dir: expand_home(&parsed.server.static_dir),
        },
        auth: AuthConfig {
            identity_header: parsed.auth.identity_header.to_ascii_lowercase(),
            token_url: parsed.auth.token_url,
            token_scope: parsed.auth.token_scope,
        },
        storage: StorageConfig {
            account: pick(&ov.storage_account, parsed.storage.account),
            container: pick(&ov.storage_container, parsed.storage.container),
            api_key: ov.storage_api_key.clone(),
        },
        search: SearchConfig {
            service: pick(&ov.search_service, parsed.search.service),
            index: pick(&ov.search_index, parsed.search.index),
            api_version: parsed.search.api_version,
            content_field: pick(&ov.kb_field_content, parsed.search.content_field),
            sourcepage_field: pick(&ov.kb_field_sourcepage, parsed.search.sourcepage_field),
            api_key: ov.search_api_key.clone(),
        },
        completion: CompletionConfig {
            service: pick(&ov.completion_service, parsed.completion.service),
            chat_deployment: pick(&ov.chat_deployment, parsed.completion.chat_deployment),
            embedding_deployment: pick(
                &ov.embedding_deployment,
                parsed.completion.embedding_deployment,
            ),
            api_version: parsed.completion.api_version,
            temperature: parsed.completion.temperature,
            timeout_seconds: parsed.completion.timeout_seconds,
        },
        usage: UsageConfig {
            endpoint: pick(&ov.usage_endpoint, parsed.usage.endpoint),
            database: pick(&ov.usage_database, parsed.usage.database),
            container: pick(&ov.usage_container, parsed.usage.container),
            api_key: ov.usage_api_key.clone(),
        },
        telemetry: TelemetryConfig {
            connection: ov
                .telemetry_connection
                .clone()
                .or(parsed.telemetry.connection),
        },
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.toml");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults_from_empty_file() {
        let (_dir, path) = write_config("");
        let cfg = load_from(&path, &EnvOverrides::default()).unwrap();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.search.content_field, "content");
        assert_eq!(cfg.search.sourcepage_field, "sourcepage");
        assert_eq!(cfg.auth.identity_header, "x-identity-token");
        assert!(!cfg.telemetry_enabled());
    }

    #[test]
    fn file_values_resolve() {
        let (_dir, path) = write_config(
            r#"
            [gateway]
            log_level = "debug"

            [search]
            service = "books-search"
            index = "books"

            [completion]
            service = "books-ai"
            chat_deployment = "chat"
            embedding_deployment = "embed"
            "#,
        );
        let cfg = load_from(&path, &EnvOverrides::default()).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.search.service, "books-search");
        assert_eq!(cfg.completion.embedding_deployment, "embed");
    }

    #[test]
    fn env_overrides_win_over_file() {
        let (_dir, path) = write_config(
            r#"
            [storage]
            account = "from-file"
            container = "content"
            "#,
        );
        let overrides = EnvOverrides {
            storage_account: Some("from-env".to_string()),
            kb_field_content: Some("body".to_string()),
            ..EnvOverrides::default()
        };
        let cfg = load_from(&path, &overrides).unwrap();
        assert_eq!(cfg.storage.account, "from-env");
        assert_eq!(cfg.storage.container, "content");
        assert_eq!(cfg.search.content_field, "body");
    }

    #[test]
    fn api_keys_come_only_from_overrides() {
        // A key in the TOML must not be picked up; only env supplies keys.
        let (_dir, path) = write_config(
            r#"
            [search]
            api_key = "should-be-ignored"
            "#,
        );
        let cfg = load_from(&path, &EnvOverrides::default()).unwrap();
        assert_eq!(cfg.search.api_key, None);

        let overrides = EnvOverrides {
            search_api_key: Some("from-env".to_string()),
            ..EnvOverrides::default()
        };
        let cfg = load_from(&path, &overrides).unwrap();
        assert_eq!(cfg.search.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/nelum.toml"), &EnvOverrides::default());
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn identity_header_is_lowercased() {
        let (_dir, path) = write_config(
            r#"
            [auth]
            identity_header = "X-Identity-Token"
            "#,
        );
        let cfg = load_from(&path, &EnvOverrides::default()).unwrap();
        assert_eq!(cfg.auth.identity_header, "x-identity-token");
    }
}
