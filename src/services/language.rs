use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use crate::config::LanguageConfig;
use crate::services::ai::CallOutcome;

/// Unicode blocks whose presence identifies the language outright.
const SCRIPT_BLOCKS: &[(char, char, &str)] = &[
    ('\u{0900}', '\u{097F}', "hi-IN"), // Devanagari
    ('\u{0980}', '\u{09FF}', "bn-IN"), // Bengali
    ('\u{0A00}', '\u{0A7F}', "pa-IN"), // Gurmukhi
    ('\u{0A80}', '\u{0AFF}', "gu-IN"), // Gujarati
    ('\u{0B00}', '\u{0B7F}', "od-IN"), // Oriya
    ('\u{0B80}', '\u{0BFF}', "ta-IN"), // Tamil
    ('\u{0C00}', '\u{0C7F}', "te-IN"), // Telugu
    ('\u{0C80}', '\u{0CFF}', "kn-IN"), // Kannada
    ('\u{0D00}', '\u{0D7F}', "ml-IN"), // Malayalam
];

/// Consecutive codepoints from one block needed before the script counts as a signal.
const MIN_SCRIPT_RUN: usize = 2;

fn script_of(c: char) -> Option<&'static str> {
    SCRIPT_BLOCKS
        .iter()
        .find(|(lo, hi, _)| (*lo..=*hi).contains(&c))
        .map(|(_, _, lang)| *lang)
}

/// Returns the language of the first run of `MIN_SCRIPT_RUN` codepoints in a known script block.
pub fn detect_script_language(text: &str) -> Option<&'static str> {
    let mut current: Option<&'static str> = None;
    let mut run = 0;

    for c in text.chars() {
        match script_of(c) {
            Some(lang) if current == Some(lang) => run += 1,
            Some(lang) => {
                current = Some(lang);
                run = 1;
            }
            None => {
                current = None;
                run = 0;
            }
        }
        if run >= MIN_SCRIPT_RUN {
            return current;
        }
    }
    None
}

#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, text: &str) -> anyhow::Result<String>;
}

pub struct SarvamLanguageDetector {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl SarvamLanguageDetector {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LanguageDetector for SarvamLanguageDetector {
    async fn detect(&self, text: &str) -> anyhow::Result<String> {
        let resp = self
            .client
            .post(format!("{}/text-lid", self.base_url))
            .header("api-subscription-key", &self.api_key)
            .json(&json!({ "input": text }))
            .send()
            .await
            .context("failed to call Sarvam language identification API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse language identification response")?;

        if !status.is_success() {
            anyhow::bail!("language identification error ({}): {}", status, data);
        }

        data["language_code"]
            .as_str()
            .filter(|code| !code.is_empty())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing language_code in response"))
    }
}

/// Script ranges first, then the external detector, then the configured fallback.
pub async fn detect_language(
    text: &str,
    detector: Option<&dyn LanguageDetector>,
    languages: &LanguageConfig,
) -> String {
    if let Some(lang) = detect_script_language(text) {
        return lang.to_string();
    }

    let Some(detector) = detector else {
        return languages.fallback_language().to_string();
    };

    match CallOutcome::from_result("detect_language", detector.detect(text).await) {
        CallOutcome::Success(code) => languages.resolve(&code),
        CallOutcome::Degraded(_) => languages.fallback_language().to_string(),
    }
}
