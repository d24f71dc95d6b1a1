use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcription {
    pub transcription: String,
    pub confidence: f32,
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
        sample_rate: u32,
        language: &str,
    ) -> anyhow::Result<Transcription>;
}

/// Sarvam speech-to-text. `audio` must be a complete WAV file.
pub struct SarvamSpeechToText {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl SarvamSpeechToText {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            model: "saarika:v2".to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpeechToText for SarvamSpeechToText {
    async fn transcribe(
        &self,
        audio: &[u8],
        sample_rate: u32,
        language: &str,
    ) -> anyhow::Result<Transcription> {
        if audio.is_empty() {
            return Err(AppError::Speech("no audio captured".to_string()).into());
        }
        tracing::debug!(bytes = audio.len(), sample_rate, language, "sending audio for transcription");

        let file = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("query.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("language_code", language.to_string());

        let resp = self
            .client
            .post(format!("{}/speech-to-text", self.base_url))
            .header("api-subscription-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .context("failed to call Sarvam speech-to-text API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse speech-to-text response")?;

        if !status.is_success() {
            anyhow::bail!("speech-to-text API error ({}): {}", status, data);
        }

        let transcription = data["transcript"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing transcript in response"))?;

        Ok(Transcription {
            transcription,
            confidence: data["confidence"].as_f64().unwrap_or(1.0) as f32,
        })
    }
}

/// Text worth processing, or `None` for an absent or blank transcription.
pub fn usable_transcript(result: Option<Transcription>) -> Option<String> {
    result
        .map(|t| t.transcription.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_transcription_is_nothing_to_process() {
        assert_eq!(usable_transcript(None), None);
        let blank = Transcription {
            transcription: "  \n".to_string(),
            confidence: 0.4,
        };
        assert_eq!(usable_transcript(Some(blank)), None);
    }

    #[test]
    fn test_transcription_is_trimmed() {
        let t = Transcription {
            transcription: " I have fever and cough for two days ".to_string(),
            confidence: 0.9,
        };
        assert_eq!(
            usable_transcript(Some(t)).as_deref(),
            Some("I have fever and cough for two days")
        );
    }

    #[tokio::test]
    async fn test_empty_audio_is_rejected_before_network() {
        let stt = SarvamSpeechToText::new("key".to_string(), "http://127.0.0.1:9".to_string());
        assert!(stt.transcribe(&[], 16000, "hi-IN").await.is_err());
    }
}
