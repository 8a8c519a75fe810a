//! Bearer-token management for the completion service.
//!
//! The token lives in a task-safe cell and is replaced, never mutated in
//! place. [`TokenCell::ensure_fresh`] runs before every inbound request:
//! when less than [`REFRESH_MARGIN_SECS`] of validity remain it fetches a
//! replacement from the credential provider. A refresh failure fails the
//! request; nothing here retries.
//!
//! Two tasks observing a stale token may both trigger a refresh — both
//! succeed and the later write wins. Duplicates are accepted rather than
//! coalesced.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::GatewayError;

/// Refresh when less than this many seconds of validity remain.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// A time-limited credential for the completion service.
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub value: String,
    /// Unix seconds after which the token is invalid.
    pub expires_at: i64,
}

// ── Credential provider clients ───────────────────────────────────────────────

/// All available credential backends.
///
/// Enum dispatch — adding a backend = new struct + new variant + new arm.
#[derive(Debug)]
pub enum CredentialClient {
    Http(HttpCredentialClient),
    Static(StaticCredential),
}

impl CredentialClient {
    pub async fn fetch(&self) -> Result<BearerToken, GatewayError> {
        match self {
            CredentialClient::Http(c) => c.fetch().await,
            CredentialClient::Static(c) => c.fetch().await,
        }
    }
}

/// Metadata-service style token endpoint client.
///
/// Issues `GET {token_url}?resource={scope}` with the `metadata: true`
/// header and expects `{access_token, expires_on | expires_in}` back.
#[derive(Debug)]
pub struct HttpCredentialClient {
    client: Client,
    token_url: String,
    scope: String,
}

impl HttpCredentialClient {
    pub fn new(token_url: String, scope: String) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build credential client: {e}")))?;
        Ok(Self { client, token_url, scope })
    }

    async fn fetch(&self) -> Result<BearerToken, GatewayError> {
        let mut req = self.client.get(&self.token_url).header("metadata", "true");
        if !self.scope.is_empty() {
            req = req.query(&[("resource", self.scope.as_str())]);
        }

        let response = req.send().await.map_err(|e| {
            warn!(url = %self.token_url, error = %e, "token request failed (transport)");
            GatewayError::Upstream(format!("token request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream(format!(
                "token endpoint returned HTTP {status}: {body}"
            )));
        }

        let parsed = response.json::<TokenResponse>().await.map_err(|e| {
            GatewayError::Upstream(format!("failed to parse token response: {e}"))
        })?;

        let now = Utc::now().timestamp();
        let expires_at = match (parsed.expires_on, parsed.expires_in) {
            (Some(on), _) => on.as_unix_seconds().ok_or_else(|| {
                GatewayError::Upstream("unparseable expires_on in token response".into())
            })?,
            (None, Some(ttl)) => now + ttl,
            (None, None) => {
                return Err(GatewayError::Upstream(
                    "token response missing expiry".into(),
                ));
            }
        };

        debug!(expires_at, "bearer token acquired");
        Ok(BearerToken { value: parsed.access_token, expires_at })
    }
}

/// Fixed dev credential — mints tokens valid for one hour.
///
/// Used when no token endpoint is configured, so the gateway runs without
/// the cloud credential stack. Counts fetches so tests can observe when a
/// refresh actually happened.
#[derive(Debug)]
pub struct StaticCredential {
    value: String,
    ttl_seconds: i64,
    fetches: AtomicU64,
}

impl StaticCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), ttl_seconds: 3600, fetches: AtomicU64::new(0) }
    }

    /// Number of times `fetch` has been called.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    async fn fetch(&self) -> Result<BearerToken, GatewayError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        Ok(BearerToken {
            value: self.value.clone(),
            expires_at: Utc::now().timestamp() + self.ttl_seconds,
        })
    }
}

// ── Token cell ────────────────────────────────────────────────────────────────

/// Process-wide bearer token, replaced on staleness.
#[derive(Debug)]
pub struct TokenCell {
    token: RwLock<BearerToken>,
    credential: CredentialClient,
}

impl TokenCell {
    /// Start with an already-expired placeholder — the first request
    /// triggers the initial fetch.
    pub fn new(credential: CredentialClient) -> Self {
        Self::with_token(
            credential,
            BearerToken { value: String::new(), expires_at: 0 },
        )
    }

    /// Start from a known token. Tests use this to pin the expiry.
    pub fn with_token(credential: CredentialClient, token: BearerToken) -> Self {
        Self { token: RwLock::new(token), credential }
    }

    /// Refresh the token iff it expires within [`REFRESH_MARGIN_SECS`].
    ///
    /// A failed refresh propagates — the caller's request fails.
    pub async fn ensure_fresh(&self) -> Result<(), GatewayError> {
        let now = Utc::now().timestamp();
        let stale = self.token.read().await.expires_at < now + REFRESH_MARGIN_SECS;
        if stale {
            let fresh = self.credential.fetch().await?;
            *self.token.write().await = fresh;
        }
        Ok(())
    }

    /// Current token value for an `Authorization: Bearer` header.
    pub async fn bearer(&self) -> String {
        self.token.read().await.value.clone()
    }

    /// Expiry of the current token (unix seconds).
    pub async fn expires_at(&self) -> i64 {
        self.token.read().await.expires_at
    }

    /// The backing credential client.
    pub fn credential(&self) -> &CredentialClient {
        &self.credential
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<UnixSeconds>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Token endpoints disagree on whether expiry timestamps are numbers or
/// numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UnixSeconds {
    Number(i64),
    Text(String),
}

impl UnixSeconds {
    fn as_unix_seconds(&self) -> Option<i64> {
        match self {
            UnixSeconds::Number(n) => Some(*n),
            UnixSeconds::Text(s) => s.parse().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_cell(expires_at: i64) -> TokenCell {
        TokenCell::with_token(
            CredentialClient::Static(StaticCredential::new("dev-token")),
            BearerToken { value: "old".to_string(), expires_at },
        )
    }

    fn fetch_count(cell: &TokenCell) -> u64 {
        match cell.credential() {
            CredentialClient::Static(c) => c.fetch_count(),
            _ => panic!("expected static credential"),
        }
    }

    #[tokio::test]
    async fn fresh_token_is_not_refreshed() {
        let cell = static_cell(Utc::now().timestamp() + 120);
        cell.ensure_fresh().await.unwrap();
        assert_eq!(fetch_count(&cell), 0);
        assert_eq!(cell.bearer().await, "old");
    }

    #[tokio::test]
    async fn token_inside_margin_is_refreshed() {
        // 59 seconds of validity left — inside the 60 s margin.
        let cell = static_cell(Utc::now().timestamp() + 59);
        cell.ensure_fresh().await.unwrap();
        assert_eq!(fetch_count(&cell), 1);
        assert_eq!(cell.bearer().await, "dev-token");
    }

    #[tokio::test]
    async fn token_just_outside_margin_is_kept() {
        let cell = static_cell(Utc::now().timestamp() + 65);
        cell.ensure_fresh().await.unwrap();
        assert_eq!(fetch_count(&cell), 0);
    }

    #[tokio::test]
    async fn refresh_resets_the_staleness_condition() {
        let cell = static_cell(0);
        cell.ensure_fresh().await.unwrap();
        assert_eq!(fetch_count(&cell), 1);
        // Immediately afterwards the condition is false — no second fetch.
        cell.ensure_fresh().await.unwrap();
        assert_eq!(fetch_count(&cell), 1);
    }

    #[tokio::test]
    async fn new_cell_starts_expired() {
        let cell = TokenCell::new(CredentialClient::Static(StaticCredential::new("t")));
        assert_eq!(cell.expires_at().await, 0);
        cell.ensure_fresh().await.unwrap();
        assert_eq!(cell.bearer().await, "t");
    }

    #[test]
    fn expiry_accepts_numbers_and_strings() {
        let n: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_on":1700000000}"#).unwrap();
        assert_eq!(n.expires_on.unwrap().as_unix_seconds(), Some(1_700_000_000));

        let s: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_on":"1700000000"}"#).unwrap();
        assert_eq!(s.expires_on.unwrap().as_unix_seconds(), Some(1_700_000_000));
    }
}
