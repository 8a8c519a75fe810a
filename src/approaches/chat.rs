//! Plain chat approach — one completion round-trip over the history.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::clients::completion::CompletionClient;
use crate::error::GatewayError;
use crate::usage::UsageLogger;

use super::{ApproachKind, Overrides, Turn, completion_messages, latest_user_content};

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer the user's questions concisely and \
     truthfully, and say so when you do not know the answer.";

pub struct ChatApproach {
    completion: Arc<CompletionClient>,
    usage: Arc<UsageLogger>,
}

impl ChatApproach {
    pub fn new(completion: Arc<CompletionClient>, usage: Arc<UsageLogger>) -> Self {
        Self { completion, usage }
    }

    pub async fn run(
        &self,
        user: &str,
        history: &[Turn],
        overrides: Option<&Overrides>,
    ) -> Result<Value, GatewayError> {
        let input = latest_user_content(history)
            .ok_or_else(|| GatewayError::BadRequest("history contains no user turn".into()))?
            .to_string();

        let system = overrides
            .and_then(|o| o.system_prompt.as_deref())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let messages = completion_messages(history, Some(system))?;
        let temperature = overrides.and_then(Overrides::temperature_value);

        let out = self.completion.complete(&messages, temperature).await?;

        self.usage
            .record(ApproachKind::Chat, user, out.total_tokens, &input, &out.text, "")
            .await?;

        Ok(json!({ "answer": out.text }))
    }
}
