pub mod nlu;
pub mod ollama;
pub mod sarvam;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat payload: the system prompt first, then the turns in order.
pub(crate) fn with_system_prompt(system_prompt: &str, messages: &[Message]) -> Vec<Message> {
    std::iter::once(Message::system(system_prompt))
        .chain(messages.iter().cloned())
        .collect()
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String>;

    /// Whether the provider has what it needs to authenticate. Local providers need nothing.
    fn has_credential(&self) -> bool {
        true
    }
}

/// Result of a call to an external collaborator, as seen by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Success(T),
    Degraded(String),
}

impl<T> CallOutcome<T> {
    /// Wraps a collaborator result, logging the degradation reason.
    pub fn from_result(operation: &str, result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => CallOutcome::Success(value),
            Err(e) => {
                tracing::warn!(operation, error = %e, "collaborator call degraded");
                CallOutcome::Degraded(format!("{operation}: {e:#}"))
            }
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            CallOutcome::Success(value) => Some(value),
            CallOutcome::Degraded(_) => None,
        }
    }

    pub fn unwrap_or(self, fallback: T) -> T {
        self.ok().unwrap_or(fallback)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, CallOutcome::Degraded(_))
    }
}

/// Pulls the JSON payload out of a chat reply: the raw text, a markdown-fenced block,
/// or the outermost `{...}` span, in that order. Returns `None` if none parse.
pub fn extract_json_object(response: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(response) {
        return Some(value);
    }

    let trimmed = response.trim();
    let cleaned = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(cleaned) {
        return Some(value);
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(&cleaned[start..=end]).ok()
}

/// Parses a reply that is nothing but JSON: the raw text, or a single markdown-fenced
/// block with nothing around it. Prose before or after the payload is rejected.
pub fn parse_json_reply(response: &str) -> Option<serde_json::Value> {
    let trimmed = response.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return Some(value);
    }

    let fenced = trimmed.strip_prefix("```")?.strip_suffix("```")?;
    if fenced.contains("```") {
        return None;
    }
    // Optional language tag on the opening fence line.
    let body = match fenced.split_once('\n') {
        Some((tag, rest)) if !tag.trim_start().starts_with('{') => rest,
        _ => fenced,
    };
    serde_json::from_str::<serde_json::Value>(body.trim()).ok()
}
