use std::sync::Arc;

use crate::config::{AppConfig, LanguageConfig};
use crate::models::SymptomKb;
use crate::services::ai::nlu::NluEngine;
use crate::services::ai::LlmProvider;
use crate::services::assessment::AssessmentSynthesizer;
use crate::services::language::LanguageDetector;
use crate::services::response::ResponseComposer;
use crate::services::translation::Translator;

/// Read-only collaborators shared by every conversation.
pub struct AppState {
    pub config: AppConfig,
    pub languages: LanguageConfig,
    pub kb: Arc<SymptomKb>,
    pub llm: Arc<dyn LlmProvider>,
    pub nlu: NluEngine,
    pub translator: Arc<dyn Translator>,
    pub composer: ResponseComposer,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        kb: SymptomKb,
        llm: Arc<dyn LlmProvider>,
        translator: Arc<dyn Translator>,
        detector: Option<Arc<dyn LanguageDetector>>,
    ) -> anyhow::Result<Self> {
        let languages = LanguageConfig::indian_languages(&config.default_language);

        let mut nlu = NluEngine::new(languages.clone(), &kb)?.with_llm(Arc::clone(&llm));
        if let Some(detector) = detector {
            nlu = nlu.with_detector(detector);
        }

        let composer = ResponseComposer::new(
            languages.clone(),
            Arc::clone(&translator),
            Arc::clone(&llm),
        );

        Ok(Self {
            config,
            languages,
            kb: Arc::new(kb),
            llm,
            nlu,
            translator,
            composer,
        })
    }

    pub fn synthesizer(&self) -> AssessmentSynthesizer {
        AssessmentSynthesizer::new(Arc::clone(&self.llm))
    }
}
