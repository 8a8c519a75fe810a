//! Usage logging — one record per completion call.
//!
//! Every successful completion writes `{approach, user, tokens, input,
//! response}` plus a timestamp; `query` is added only when the approach
//! actually searched for something. A failed write propagates to the
//! dispatch boundary — usage accounting is not best-effort.

use chrono::Utc;
use serde_json::{Value, json};

use crate::approaches::ApproachKind;
use crate::clients::docdb::UsageStore;
use crate::error::GatewayError;

pub struct UsageLogger {
    store: UsageStore,
}

impl UsageLogger {
    pub fn new(store: UsageStore) -> Self {
        Self { store }
    }

    /// The backing store. Tests use this to inspect the memory backend.
    pub fn store(&self) -> &UsageStore {
        &self.store
    }

    /// Write one usage record; returns the generated record id.
    ///
    /// An empty `query` leaves the field out of the document entirely
    /// rather than writing an empty string.
    pub async fn record(
        &self,
        kind: ApproachKind,
        user: &str,
        total_tokens: u64,
        input: &str,
        response: &str,
        query: &str,
    ) -> Result<String, GatewayError> {
        let mut doc = json!({
            "approach": kind.as_str(),
            "user": user,
            "tokens": total_tokens,
            "input": input,
            "response": response,
            "timestamp": Utc::now().to_rfc3339(),
        });

        if !query.is_empty() {
            doc["query"] = Value::String(query.to_string());
        }

        self.store.create(doc).await
    }
}
