use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{with_system_prompt, LlmProvider, Message};

/// Local model served by Ollama. Needs no credential.
pub struct OllamaProvider {
    url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }

    fn request<'a>(&'a self, system_prompt: &str, messages: &[Message]) -> OllamaChatRequest<'a> {
        // Prompts that demand JSON get Ollama's JSON mode.
        let wants_json = system_prompt.contains("Return ONLY valid JSON");
        OllamaChatRequest {
            model: &self.model,
            messages: with_system_prompt(system_prompt, messages),
            stream: false,
            format: wants_json.then_some("json"),
            options: OllamaOptions { temperature: 0.2 },
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let body = self.request(system_prompt, messages);

        let resp = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&body)
            .send()
            .await
            .context("failed to call Ollama API")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error ({}): {}", status, text);
        }

        let data: OllamaChatResponse = resp
            .json()
            .await
            .context("failed to parse Ollama response")?;
        Ok(data.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_prompts_use_json_mode() {
        let provider = OllamaProvider::new("http://localhost:11434/".to_string(), "llama3.2".to_string());
        assert_eq!(provider.url, "http://localhost:11434");

        let structured = provider.request("Return ONLY valid JSON (no markdown)", &[Message::user("fever")]);
        assert_eq!(structured.format, Some("json"));
        assert_eq!(structured.messages.len(), 2);
        assert_eq!(structured.messages[0].role, "system");

        let free_text = provider.request("You are HealHub Assistant", &[]);
        assert_eq!(free_text.format, None);
    }
}
