//! Chat-completions client for the managed completion service.
//!
//! Exposes a single `complete(messages) -> CompletionOutput` interface.
//! All wire types are private to this module — callers never see them.
//! The bearer token is read from the shared [`TokenCell`] on every call,
//! so a refresh between requests is picked up without reconstructing the
//! client.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::auth::TokenCell;
use crate::error::GatewayError;

/// One turn handed to the completion service.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: role.into(), content: content.into() }
    }
}

/// Completion text plus the token count the service billed for it.
#[derive(Debug, Clone)]
pub struct CompletionOutput {
    pub text: String,
    pub total_tokens: u64,
}

// ── Client enum ───────────────────────────────────────────────────────────────

/// All available completion backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait`
/// dependency. Adding a backend = new struct + new variant + new arm.
#[derive(Debug)]
pub enum CompletionClient {
    Http(HttpCompletionClient),
    Dummy(DummyCompletionClient),
}

impl CompletionClient {
    /// One completion round-trip.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
    ) -> Result<CompletionOutput, GatewayError> {
        match self {
            CompletionClient::Http(c) => c.complete(messages, temperature).await,
            CompletionClient::Dummy(c) => c.complete(messages).await,
        }
    }
}

// ── HTTP backend ──────────────────────────────────────────────────────────────

/// Adapter for a deployment-scoped `/chat/completions` endpoint.
#[derive(Debug)]
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
    default_temperature: f32,
    token: Arc<TokenCell>,
}

impl HttpCompletionClient {
    pub fn new(
        service: &str,
        deployment: &str,
        api_version: &str,
        temperature: f32,
        timeout_seconds: u64,
        token: Arc<TokenCell>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!(
            "https://{service}.openai.azure.com/openai/deployments/{deployment}/chat/completions?api-version={api_version}"
        );

        Ok(Self { client, endpoint, default_temperature: temperature, token })
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
    ) -> Result<CompletionOutput, GatewayError> {
        let payload = ChatCompletionRequest {
            messages,
            temperature: temperature.unwrap_or(self.default_temperature),
        };

        debug!(
            message_count = messages.len(),
            temperature = payload.temperature,
            "sending completion request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full completion request payload");
        }

        let bearer = self.token.bearer().await;
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(bearer)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.endpoint, error = %e, "completion request failed (transport)");
                GatewayError::Upstream(e.to_string())
            })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize completion response");
            GatewayError::Upstream(format!("failed to parse completion body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received completion response");

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::Upstream("empty or missing content in completion".into()))?;

        let total_tokens = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);

        Ok(CompletionOutput { text, total_tokens })
    }
}

// ── Dummy backend ─────────────────────────────────────────────────────────────

/// Offline completion backend — echoes the latest user message.
///
/// Used when no completion service is configured, and by tests. The
/// failing variant injects a deterministic upstream error.
#[derive(Debug, Default)]
pub struct DummyCompletionClient {
    reply: Option<String>,
    fail: Option<String>,
}

impl DummyCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with `reply` instead of echoing.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self { reply: Some(reply.into()), fail: None }
    }

    /// Always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { reply: None, fail: Some(message.into()) }
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionOutput, GatewayError> {
        if let Some(message) = &self.fail {
            return Err(GatewayError::Upstream(message.clone()));
        }
        let text = match &self.reply {
            Some(reply) => reply.clone(),
            None => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == "user")
                    .map(|m| m.content.as_str())
                    .unwrap_or_default();
                format!("[echo] {last_user}")
            }
        };
        Ok(CompletionOutput { text, total_tokens: 0 })
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Deserialize)]
struct UsageData {
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by the completion service and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let code = env.error.code.map(|v| match v {
            serde_json::Value::String(s) => format!(" [code={s}]"),
            other => format!(" [code={other}]"),
        }).unwrap_or_default();
        format!("HTTP {status}{code}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    };

    error!(%status, %message, "completion request returned HTTP error");
    Err(GatewayError::Upstream(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dummy_echoes_latest_user_message() {
        let c = DummyCompletionClient::new();
        let messages = vec![
            ChatMessage::new("user", "first"),
            ChatMessage::new("assistant", "reply"),
            ChatMessage::new("user", "second"),
        ];
        let out = c.complete(&messages).await.unwrap();
        assert_eq!(out.text, "[echo] second");
        assert_eq!(out.total_tokens, 0);
    }

    #[tokio::test]
    async fn dummy_fixed_reply() {
        let c = DummyCompletionClient::with_reply("canned");
        let out = c.complete(&[ChatMessage::new("user", "q")]).await.unwrap();
        assert_eq!(out.text, "canned");
    }

    #[tokio::test]
    async fn dummy_failure_carries_message() {
        let c = DummyCompletionClient::failing("completion service exploded");
        let err = c.complete(&[]).await.unwrap_err();
        assert_eq!(err.to_string(), "completion service exploded");
    }
}
