use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{with_system_prompt, LlmProvider, Message};
use crate::errors::AppError;

const TEMPERATURE: f32 = 0.2;

/// Sarvam's OpenAI-compatible chat completions, authenticated with a bearer key.
pub struct SarvamProvider {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl ChatCompletionResponse {
    fn into_content(self) -> Option<String> {
        self.choices.into_iter().next().map(|c| c.message.content)
    }
}

impl SarvamProvider {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }

    fn request<'a>(&'a self, system_prompt: &str, messages: &[Message]) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: with_system_prompt(system_prompt, messages),
            temperature: TEMPERATURE,
        }
    }
}

#[async_trait]
impl LlmProvider for SarvamProvider {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        if !self.has_credential() {
            return Err(AppError::Ai("SARVAM_API_KEY is not configured".to_string()).into());
        }

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request(system_prompt, messages))
            .send()
            .await
            .context("Sarvam chat request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Sarvam chat returned {}: {}", status, text);
        }

        let completion: ChatCompletionResponse = resp
            .json()
            .await
            .context("Sarvam chat reply is not a chat completion")?;
        completion
            .into_content()
            .ok_or_else(|| AppError::Ai("Sarvam chat reply has no choices".to_string()).into())
    }

    fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(key: &str) -> SarvamProvider {
        SarvamProvider::new(key.to_string(), "http://127.0.0.1:9/".to_string(), "sarvam-m".to_string())
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let provider = provider("  ");
        assert!(!provider.has_credential());
        let err = provider.chat("system", &[Message::user("hi")]).await.unwrap_err();
        assert!(err.to_string().contains("SARVAM_API_KEY"));
    }

    #[test]
    fn test_request_puts_system_prompt_first() {
        let provider = provider("key");
        assert_eq!(provider.base_url, "http://127.0.0.1:9");

        let body = serde_json::to_value(provider.request("You are HealHub", &[Message::user("fever")])).unwrap();
        assert_eq!(body["model"], "sarvam-m");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "fever");
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_completion_content_and_empty_choices() {
        let reply: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Rest well."},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(reply.into_content().as_deref(), Some("Rest well."));

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(empty.into_content(), None);
    }
}
