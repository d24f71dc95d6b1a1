use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use healhub::config::AppConfig;
use healhub::errors::AppError;
use healhub::models::SymptomKb;
use healhub::services::ai::ollama::OllamaProvider;
use healhub::services::ai::sarvam::SarvamProvider;
use healhub::services::ai::{CallOutcome, LlmProvider};
use healhub::services::conversation::ConversationSession;
use healhub::services::language::{LanguageDetector, SarvamLanguageDetector};
use healhub::services::speech::{usable_transcript, SarvamSpeechToText, SpeechToText};
use healhub::services::translation::{PassthroughTranslator, SarvamTranslator, Translator};
use healhub::state::AppState;

const AUDIO_SAMPLE_RATE: u32 = 16000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let llm: Arc<dyn LlmProvider> = match config.llm_provider.as_str() {
        "sarvam" => {
            if !config.has_sarvam_key() {
                tracing::warn!("SARVAM_API_KEY is not set, assessments and general answers will use fallbacks");
            }
            tracing::info!("using Sarvam LLM provider (model: {})", config.llm_model);
            Arc::new(SarvamProvider::new(
                config.sarvam_api_key.clone(),
                config.sarvam_base_url.clone(),
                config.llm_model.clone(),
            ))
        }
        "ollama" => {
            tracing::info!("using Ollama LLM provider (url: {})", config.ollama_url);
            Arc::new(OllamaProvider::new(config.ollama_url.clone(), config.ollama_model.clone()))
        }
        other => {
            return Err(AppError::Config(format!("unknown LLM_PROVIDER: {other}")).into());
        }
    };

    let mut detector: Option<Arc<dyn LanguageDetector>> = None;
    let translator: Arc<dyn Translator> = if config.has_sarvam_key() {
        let lid: Arc<dyn LanguageDetector> = Arc::new(SarvamLanguageDetector::new(
            config.sarvam_api_key.clone(),
            config.sarvam_base_url.clone(),
        ));
        detector = Some(lid);
        Arc::new(SarvamTranslator::new(
            config.sarvam_api_key.clone(),
            config.sarvam_base_url.clone(),
        ))
    } else {
        tracing::warn!("no translation service configured, replies stay in English");
        Arc::new(PassthroughTranslator)
    };

    let kb = SymptomKb::load_or_empty(&config.symptom_kb_path);
    let state = Arc::new(AppState::new(config, kb, llm, translator, detector)?);
    let config = &state.config;
    let user_language = config.user_language.clone();
    let mut session = ConversationSession::new(Arc::clone(&state));

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"HealHub: describe how you feel, or ask a health question. Type 'exit' to quit.\n")
        .await?;

    // Optional spoken first query: `healhub --audio query.wav`
    let args: Vec<String> = std::env::args().collect();
    if let Some(path) = args.iter().position(|a| a == "--audio").and_then(|i| args.get(i + 1)) {
        let language = user_language
            .clone()
            .unwrap_or_else(|| config.default_language.clone());
        let audio = tokio::fs::read(path).await?;
        let stt = SarvamSpeechToText::new(config.sarvam_api_key.clone(), config.sarvam_base_url.clone());
        let transcription = CallOutcome::from_result(
            "transcribe",
            stt.transcribe(&audio, AUDIO_SAMPLE_RATE, &language).await,
        )
        .ok();

        match usable_transcript(transcription) {
            Some(text) => {
                stdout.write_all(format!("You (voice): {text}\n").as_bytes()).await?;
                if let Some(reply) = session.handle_utterance(&text, Some(&language)).await {
                    stdout.write_all(format!("HealHub: {reply}\n").as_bytes()).await?;
                }
            }
            None => {
                tracing::warn!(path = %path, "no usable transcription from audio");
                stdout
                    .write_all(b"HealHub: I couldn't understand the recording. Please type your question.\n")
                    .await?;
            }
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if matches!(line.trim().to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        if let Some(reply) = session.handle_utterance(&line, user_language.as_deref()).await {
            stdout.write_all(format!("HealHub: {reply}\n").as_bytes()).await?;
        }
    }

    tracing::info!(
        session = %session.id(),
        turns = session.messages().len() / 2,
        duration_secs = (Utc::now() - session.started_at()).num_seconds(),
        "conversation ended"
    );
    Ok(())
}
