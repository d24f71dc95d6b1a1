use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use crate::services::ai::CallOutcome;

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String>;
}

pub struct SarvamTranslator {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl SarvamTranslator {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Translator for SarvamTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String> {
        let body = json!({
            "input": text,
            "source_language_code": "auto",
            "target_language_code": target_language,
            "mode": "formal",
            "model": "mayura:v1",
        });

        let resp = self
            .client
            .post(format!("{}/translate", self.base_url))
            .header("api-subscription-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call Sarvam translate API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse translate response")?;

        if !status.is_success() {
            anyhow::bail!("translate API error ({}): {}", status, data);
        }

        data["translated_text"]
            .as_str()
            .map(clean_whitespace)
            .ok_or_else(|| anyhow::anyhow!("missing translated_text in response"))
    }
}

/// Used when no translation service is configured.
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str, _target_language: &str) -> anyhow::Result<String> {
        Ok(text.to_string())
    }
}

/// Collapses whitespace runs to single spaces and trims the ends.
pub fn clean_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_english(language: &str) -> bool {
    language.to_lowercase().starts_with("en")
}

/// Translates into `target_language`; English targets and failures return `text` unchanged.
pub async fn translate_or_passthrough(
    translator: &dyn Translator,
    text: &str,
    target_language: &str,
) -> String {
    if is_english(target_language) || text.trim().is_empty() {
        return text.to_string();
    }
    CallOutcome::from_result("translate", translator.translate(text, target_language).await)
        .unwrap_or(text.to_string())
}

pub async fn translate_to_english(translator: &dyn Translator, text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }
    CallOutcome::from_result("translate_to_english", translator.translate(text, "en-IN").await)
        .unwrap_or(text.to_string())
}
