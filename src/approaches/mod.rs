//! Approaches — named strategies for answering a conversation.
//!
//! [`ApproachRegistry`] maps an approach name to a handler per
//! [`ApproachKind`], built once at startup from the injected service
//! clients. Handlers are enum-dispatched; each one exposes the same
//! `run(user, history, overrides) -> JSON` contract and differs in whether
//! it queries the search index before calling the completion service.
//!
//! Dispatching an unknown name fails before any handler work happens — no
//! service call, no usage record.

mod chat;
mod docsearch;

pub use chat::ChatApproach;
pub use docsearch::RetrieveThenReadApproach;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::clients::completion::ChatMessage;
use crate::error::GatewayError;

// ── Request types ─────────────────────────────────────────────────────────────

/// Supported approach families. Closed set — request strings are validated
/// against it at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApproachKind {
    Chat,
    DocSearch,
}

impl ApproachKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ApproachKind::Chat => "chat",
            ApproachKind::DocSearch => "docsearch",
        }
    }
}

/// One turn of conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

/// Per-request tuning parameters. Every field is optional; handlers read
/// only the ones they understand.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Overrides {
    pub retrieval_mode: Option<String>,
    pub semantic_ranker: Option<bool>,
    pub semantic_captions: Option<bool>,
    pub exclude_category: Option<String>,
    pub top: Option<usize>,
    /// Clients send this as a string; parsed leniently.
    pub temperature: Option<String>,
    pub prompt_template: Option<String>,
    pub prompt_template_prefix: Option<String>,
    pub prompt_template_suffix: Option<String>,
    pub system_prompt: Option<String>,
}

impl Overrides {
    /// Temperature override as a number, if present and parseable.
    pub(crate) fn temperature_value(&self) -> Option<f32> {
        let raw = self.temperature.as_deref()?;
        match raw.parse::<f32>() {
            Ok(t) => Some(t),
            Err(_) => {
                warn!(raw, "ignoring unparseable temperature override");
                None
            }
        }
    }
}

// ── Handler enum ──────────────────────────────────────────────────────────────

/// All handler implementations.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait`
/// dependency. Adding an approach = new module + new variant + new arm.
pub enum ApproachHandler {
    Chat(ChatApproach),
    Retrieve(RetrieveThenReadApproach),
}

impl ApproachHandler {
    /// Run the approach and return its caller-facing JSON result.
    pub async fn run(
        &self,
        user: &str,
        history: &[Turn],
        overrides: Option<&Overrides>,
    ) -> Result<Value, GatewayError> {
        match self {
            ApproachHandler::Chat(a) => a.run(user, history, overrides).await,
            ApproachHandler::Retrieve(a) => a.run(user, history, overrides).await,
        }
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Name → handler maps, one per approach kind.
///
/// Constructed once at startup and owned by the process for its lifetime.
#[derive(Default)]
pub struct ApproachRegistry {
    chat: HashMap<String, ApproachHandler>,
    docsearch: HashMap<String, ApproachHandler>,
}

impl ApproachRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: ApproachKind,
        name: impl Into<String>,
        handler: ApproachHandler,
    ) {
        self.map_for_mut(kind).insert(name.into(), handler);
    }

    pub fn get(&self, kind: ApproachKind, name: &str) -> Option<&ApproachHandler> {
        self.map_for(kind).get(name)
    }

    /// Look up the handler and run it.
    ///
    /// Unknown names fail with [`GatewayError::UnknownApproach`] without
    /// touching any handler. Handler failures pass through untouched; the
    /// HTTP boundary maps and logs them.
    pub async fn dispatch(
        &self,
        kind: ApproachKind,
        name: &str,
        user: &str,
        history: &[Turn],
        overrides: Option<&Overrides>,
    ) -> Result<Value, GatewayError> {
        let handler = self.get(kind, name).ok_or(GatewayError::UnknownApproach)?;
        handler.run(user, history, overrides).await
    }

    fn map_for(&self, kind: ApproachKind) -> &HashMap<String, ApproachHandler> {
        match kind {
            ApproachKind::Chat => &self.chat,
            ApproachKind::DocSearch => &self.docsearch,
        }
    }

    fn map_for_mut(&mut self, kind: ApproachKind) -> &mut HashMap<String, ApproachHandler> {
        match kind {
            ApproachKind::Chat => &mut self.chat,
            ApproachKind::DocSearch => &mut self.docsearch,
        }
    }
}

// ── Shared history handling ───────────────────────────────────────────────────

/// Render the conversation history into completion messages, prepending
/// `system` when given.
///
/// Roles outside `user` / `assistant` / `system` are rejected — the wire
/// format is a closed set.
pub(crate) fn completion_messages(
    history: &[Turn],
    system: Option<&str>,
) -> Result<Vec<ChatMessage>, GatewayError> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if let Some(system) = system {
        messages.push(ChatMessage::new("system", system));
    }

    for turn in history {
        match turn.role.as_str() {
            "user" | "assistant" | "system" => {
                messages.push(ChatMessage::new(turn.role.as_str(), turn.content.as_str()));
            }
            other => {
                return Err(GatewayError::BadRequest(format!(
                    "unknown role in history: {other}"
                )));
            }
        }
    }

    Ok(messages)
}

/// Content of the most recent `user` turn, if any.
pub(crate) fn latest_user_content(history: &[Turn]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|t| t.role == "user")
        .map(|t| t.content.as_str())
}
