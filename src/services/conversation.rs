use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ConversationMessage, HealthIntent, NluResult, PendingQuestion};
use crate::services::ai::nlu::{detect_affirmed_emergency, detect_emergency};
use crate::services::response::safety_check;
use crate::services::symptom_checker::SymptomChecker;
use crate::services::translation::translate_to_english;
use crate::state::AppState;

/// One user's conversation. Holds at most one symptom dialogue at a time.
pub struct ConversationSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    state: Arc<AppState>,
    checker: Option<SymptomChecker>,
    pending: Option<PendingQuestion>,
    language: Option<String>,
    messages: Vec<ConversationMessage>,
}

impl ConversationSession {
    pub fn new(state: Arc<AppState>) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            state,
            checker: None,
            pending: None,
            language: None,
            messages: Vec::new(),
        };
        tracing::info!(session = %session.id, started_at = %session.started_at, "conversation started");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn in_dialogue(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_question(&self) -> Option<&PendingQuestion> {
        self.pending.as_ref()
    }

    /// Handles one user turn. `None` means there was nothing to process.
    pub async fn handle_utterance(&mut self, text: &str, language_hint: Option<&str>) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!(session = %self.id, "blank utterance, nothing to process");
            return None;
        }

        let hint = language_hint.map(str::trim).filter(|h| !h.is_empty());
        self.messages.push(ConversationMessage::user(text));

        let reply = if self.in_dialogue() {
            self.handle_answer(text, hint).await
        } else {
            self.handle_query(text, hint).await
        };

        self.messages.push(ConversationMessage::assistant(reply.clone()));
        Some(reply)
    }

    async fn handle_query(&mut self, text: &str, hint: Option<&str>) -> String {
        let language = match hint {
            Some(h) => h.to_string(),
            None => self.state.nlu.detect_language(text).await,
        };
        self.language = Some(language.clone());

        let analysis_text = self.to_english(text, &language).await;
        let mut nlu = self.state.nlu.classify(&analysis_text, Some(&language)).await;
        flag_native_emergency(&mut nlu, text);

        tracing::info!(
            session = %self.id,
            intent = nlu.intent.as_str(),
            language = self.state.languages.display_name(&language),
            "new query"
        );

        let check = safety_check(&nlu);
        if check.requires_redirect {
            tracing::info!(
                session = %self.id,
                is_emergency = check.is_emergency,
                issues = ?check.detected_issues,
                "safety redirect"
            );
            return match self.state.composer.safety_redirect(&nlu).await {
                Some(redirect) => redirect,
                None => check.message,
            };
        }

        match nlu.intent {
            HealthIntent::SymptomQuery => self.start_dialogue(nlu).await,
            _ => self.state.composer.compose_general_info(text, &nlu).await,
        }
    }

    async fn start_dialogue(&mut self, nlu: NluResult) -> String {
        let mut checker = SymptomChecker::new(Arc::clone(&self.state.kb), nlu, self.state.synthesizer());
        checker.prepare_follow_up_questions();
        self.advance(checker).await
    }

    async fn handle_answer(&mut self, text: &str, hint: Option<&str>) -> String {
        if let Some(h) = hint {
            self.language = Some(h.to_string());
        }
        let language = self.current_language();
        let answer = self.to_english(text, &language).await;

        let issues: Vec<String> = detect_affirmed_emergency(text)
            .into_iter()
            .chain(detect_affirmed_emergency(&answer))
            .collect();
        if !issues.is_empty() {
            tracing::warn!(session = %self.id, issues = ?issues, "emergency reported mid-dialogue, ending dialogue");
            self.checker = None;
            self.pending = None;
            return self.state.composer.emergency_redirect(&language).await;
        }

        let (Some(mut checker), Some(question)) = (self.checker.take(), self.pending.take()) else {
            return self.handle_query(text, hint).await;
        };
        checker.record_answer(&question.symptom_name, &question.question, &answer);
        self.advance(checker).await
    }

    /// Asks the next queued question, or finishes the dialogue with an assessment.
    async fn advance(&mut self, mut checker: SymptomChecker) -> String {
        let language = self.current_language();

        match checker.get_next_question() {
            Some(next) => {
                tracing::info!(session = %self.id, symptom = %next.symptom_name, "asking follow-up question");
                let question = self.state.composer.localize(&next.question, &language).await;
                self.pending = Some(next);
                self.checker = Some(checker);
                question
            }
            None => {
                tracing::info!(
                    session = %self.id,
                    symptoms = checker.state().collected_symptom_details.len(),
                    "dialogue finished, generating assessment"
                );
                let assessment = checker.generate_preliminary_assessment().await;
                self.state.composer.compose_assessment(&assessment, &language).await
            }
        }
    }

    async fn to_english(&self, text: &str, language: &str) -> String {
        if language.to_lowercase().starts_with("en") {
            text.to_string()
        } else {
            translate_to_english(self.state.translator.as_ref(), text).await
        }
    }

    fn current_language(&self) -> String {
        self.language
            .clone()
            .unwrap_or_else(|| self.state.languages.fallback_language().to_string())
    }
}

/// Emergency phrases in the user's own words count even when translation lost them.
fn flag_native_emergency(nlu: &mut NluResult, native_text: &str) {
    if nlu.is_emergency || detect_emergency(native_text).is_empty() {
        return;
    }
    nlu.is_emergency = true;
    nlu.requires_disclaimer = false;
    if nlu.intent == HealthIntent::Unknown {
        nlu.intent = HealthIntent::Emergency;
    }
}
