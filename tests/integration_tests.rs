use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use healhub::config::AppConfig;
use healhub::models::assessment::DEFAULT_ASSESSMENT_SUMMARY;
use healhub::models::{
    AssessmentResult, HealthIntent, MedicalEntity, NluResult, SymptomKb, CANONICAL_DISCLAIMER,
};
use healhub::services::ai::{LlmProvider, Message};
use healhub::services::conversation::ConversationSession;
use healhub::services::symptom_checker::SymptomChecker;
use healhub::services::translation::Translator;
use healhub::state::AppState;

// ── Mock Providers ──

const KB_JSON: &str = r#"{
    "symptoms": [
        {"symptom_name": "fever", "keywords": ["temperature", "hot"], "follow_up_questions": ["How high is the fever?", "Any chills?"], "basic_triage_points": ["Fever > 3 days needs check.", "High fever is concerning."]},
        {"symptom_name": "cough", "keywords": ["hacking"], "follow_up_questions": ["Is it a dry cough or wet cough?", "How long have you had it?"], "basic_triage_points": ["Persistent cough needs check.", "Coughing blood is urgent."]},
        {"symptom_name": "headache", "keywords": ["head pain"], "follow_up_questions": ["Where is the headache located?", "Is it throbbing?"], "basic_triage_points": ["Sudden severe headache is urgent."]}
    ]
}"#;

const VALID_ASSESSMENT: &str = r#"```json
{"assessment_summary": "You reported a fever of 101F and a dry cough.", "suggested_severity": "May require attention", "recommended_next_steps": "Rest, drink fluids and see a doctor if it lasts more than 3 days.", "potential_warnings": ["Difficulty breathing"], "disclaimer": "Trust me, I'm a doctor."}
```"#;

struct MockLlm {
    has_key: bool,
    classifier_reply: String,
    assessment_reply: String,
    general_reply: String,
    calls: AtomicUsize,
    system_prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    fn new(has_key: bool) -> Self {
        Self {
            has_key,
            classifier_reply: r#"{"intent": "symptom_query", "confidence": 0.85, "entities": []}"#
                .to_string(),
            assessment_reply: VALID_ASSESSMENT.to_string(),
            general_reply: "Diabetes is a long-term condition affecting blood sugar.".to_string(),
            calls: AtomicUsize::new(0),
            system_prompts: Mutex::new(vec![]),
        }
    }

    fn with_classifier_reply(mut self, reply: &str) -> Self {
        self.classifier_reply = reply.to_string();
        self
    }

    fn with_assessment_reply(mut self, reply: &str) -> Self {
        self.assessment_reply = reply.to_string();
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn chat(&self, system_prompt: &str, _messages: &[Message]) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.system_prompts
            .lock()
            .unwrap()
            .push(system_prompt.to_string());

        if system_prompt.contains("language understanding layer") {
            Ok(self.classifier_reply.clone())
        } else if system_prompt.contains("preliminary assessment") {
            Ok(self.assessment_reply.clone())
        } else {
            Ok(self.general_reply.clone())
        }
    }

    fn has_credential(&self) -> bool {
        self.has_key
    }
}

/// Marks non-English output with its target so tests can see what was translated.
struct MockTranslator {
    calls: AtomicUsize,
}

impl MockTranslator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if target_language == "en-IN" {
            return Ok(match text {
                "मुझे बुखार है" => "I have fever".to_string(),
                "मुझे सीने में दर्द है" => "I have pain".to_string(),
                other => other.to_string(),
            });
        }
        Ok(format!("[{target_language}] {text}"))
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        sarvam_api_key: String::new(),
        sarvam_base_url: "http://localhost:9".to_string(),
        llm_provider: "sarvam".to_string(),
        llm_model: "sarvam-m".to_string(),
        ollama_url: "http://localhost:11434".to_string(),
        ollama_model: "llama3.2".to_string(),
        symptom_kb_path: "unused.json".to_string(),
        default_language: "en-IN".to_string(),
        user_language: None,
    }
}

fn test_kb() -> SymptomKb {
    SymptomKb::from_json(KB_JSON).unwrap()
}

fn test_state(llm: Arc<MockLlm>) -> Arc<AppState> {
    Arc::new(AppState::new(test_config(), test_kb(), llm, Arc::new(MockTranslator::new()), None).unwrap())
}

fn symptom_nlu(symptoms: &[&str]) -> NluResult {
    let entities = symptoms
        .iter()
        .map(|s| MedicalEntity {
            text: s.to_string(),
            entity_type: "symptom".to_string(),
            confidence: 0.9,
            start_pos: 0,
            end_pos: s.chars().count(),
        })
        .collect();
    NluResult {
        original_text: symptoms.join(" and "),
        intent: HealthIntent::SymptomQuery,
        entities,
        confidence: 0.9,
        is_emergency: false,
        requires_disclaimer: true,
        language_detected: "en-IN".to_string(),
    }
}

fn checker(state: &AppState, symptoms: &[&str]) -> SymptomChecker {
    SymptomChecker::new(Arc::clone(&state.kb), symptom_nlu(symptoms), state.synthesizer())
}

// ── Assessment ──

#[tokio::test]
async fn test_assessment_without_credential_makes_no_calls() {
    let llm = Arc::new(MockLlm::new(false));
    let state = test_state(Arc::clone(&llm));
    let mut checker = checker(&state, &["fever"]);
    checker.record_answer("fever", "How high is the fever?", "101F");

    let assessment = checker.generate_preliminary_assessment().await;

    assert_eq!(assessment, AssessmentResult::default_error());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_assessment_missing_summary_is_reported() {
    let llm = Arc::new(MockLlm::new(true).with_assessment_reply(
        r#"{"suggested_severity": "Likely mild", "recommended_next_steps": "Rest.", "potential_warnings": [], "disclaimer": "x"}"#,
    ));
    let state = test_state(Arc::clone(&llm));
    let mut checker = checker(&state, &["fever"]);
    checker.record_answer("fever", "How high is the fever?", "101F");

    let assessment = checker.generate_preliminary_assessment().await;

    assert_eq!(assessment.assessment_summary, DEFAULT_ASSESSMENT_SUMMARY);
    assert!(assessment
        .potential_warnings
        .contains(&"LLM response missing key: assessment_summary".to_string()));
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_assessment_carries_triage_points_and_canonical_disclaimer() {
    let llm = Arc::new(MockLlm::new(true));
    let state = test_state(Arc::clone(&llm));
    let mut checker = checker(&state, &["fever", "cough"]);
    checker.record_answer("fever", "How high is the fever?", "101F");
    checker.record_answer("cough", "Is it a dry cough or wet cough?", "Dry");

    let assessment = checker.generate_preliminary_assessment().await;

    assert_eq!(assessment.assessment_summary, "You reported a fever of 101F and a dry cough.");
    assert_eq!(assessment.disclaimer, CANONICAL_DISCLAIMER);
    for point in [
        "Fever > 3 days needs check.",
        "High fever is concerning.",
        "Persistent cough needs check.",
        "Coughing blood is urgent.",
    ] {
        assert!(assessment.relevant_kb_triage_points.contains(&point.to_string()));
    }
}

// ── Dialogue ──

#[tokio::test]
async fn test_four_questions_then_none() {
    let state = test_state(Arc::new(MockLlm::new(false)));
    let mut checker = checker(&state, &["fever", "cough"]);
    checker.prepare_follow_up_questions();

    let asked: Vec<String> = std::iter::from_fn(|| checker.get_next_question())
        .map(|q| q.question)
        .collect();

    assert_eq!(
        asked,
        vec![
            "How high is the fever?",
            "Any chills?",
            "Is it a dry cough or wet cough?",
            "How long have you had it?",
        ]
    );
    assert!(checker.get_next_question().is_none());
}

// ── Knowledge base loading ──

#[test]
fn test_malformed_kb_file_loads_empty() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{ \"symptoms\": [ {\"symptom_name\": ").unwrap();

    let kb = SymptomKb::load_or_empty(file.path());
    assert!(kb.is_empty());
}

#[test]
fn test_missing_kb_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let kb = SymptomKb::load_or_empty(dir.path().join("does_not_exist.json"));
    assert!(kb.is_empty());
}

#[test]
fn test_bundled_kb_file_loads() {
    let kb = SymptomKb::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/symptom_kb.json")).unwrap();
    assert!(kb.get("fever").is_some());
    assert!(kb.get("cough").is_some());
    assert!(kb.entries().iter().all(|e| !e.follow_up_questions.is_empty()));
}

// ── Conversation ──

#[tokio::test]
async fn test_blank_utterance_is_ignored() {
    let mut session = ConversationSession::new(test_state(Arc::new(MockLlm::new(true))));
    assert_eq!(session.handle_utterance("   ", None).await, None);
    assert!(session.messages().is_empty());
}

#[tokio::test]
async fn test_symptom_dialogue_end_to_end() {
    let llm = Arc::new(MockLlm::new(true));
    let mut session = ConversationSession::new(test_state(Arc::clone(&llm)));

    let first = session
        .handle_utterance("I have fever and cough", Some("en-IN"))
        .await
        .unwrap();
    assert_eq!(first, "How high is the fever?");
    assert!(session.in_dialogue());

    let answers = ["101F", "No chills", "Dry", "Two days"];
    let mut last = String::new();
    for answer in answers {
        last = session.handle_utterance(answer, None).await.unwrap();
    }

    assert!(!session.in_dialogue());
    assert!(last.contains("Preliminary assessment: You reported a fever of 101F and a dry cough."));
    assert!(last.contains("- Persistent cough needs check."));
    assert!(last.ends_with(CANONICAL_DISCLAIMER));
    // classifier + assessment
    assert_eq!(llm.calls(), 2);
    assert_eq!(session.messages().len(), 10);
}

#[tokio::test]
async fn test_emergency_query_is_redirected() {
    let llm = Arc::new(MockLlm::new(false));
    let mut session = ConversationSession::new(test_state(Arc::clone(&llm)));

    let reply = session
        .handle_utterance("I have severe chest pain", Some("en-IN"))
        .await
        .unwrap();

    assert!(reply.contains("nearest hospital"));
    assert!(!session.in_dialogue());
}

#[tokio::test]
async fn test_emergency_answer_ends_dialogue() {
    let mut session = ConversationSession::new(test_state(Arc::new(MockLlm::new(true))));
    session
        .handle_utterance("I have a headache", Some("en-IN"))
        .await
        .unwrap();
    assert!(session.in_dialogue());

    let reply = session
        .handle_utterance("now I have difficulty breathing", None)
        .await
        .unwrap();

    assert!(reply.contains("nearest hospital"));
    assert!(!session.in_dialogue());
}

#[tokio::test]
async fn test_denied_emergency_answer_continues_dialogue() {
    let mut session = ConversationSession::new(test_state(Arc::new(MockLlm::new(true))));
    let first = session
        .handle_utterance("I have fever and cough", Some("en-IN"))
        .await
        .unwrap();
    assert_eq!(first, "How high is the fever?");

    let reply = session
        .handle_utterance("no, no chest pain", None)
        .await
        .unwrap();

    assert_eq!(reply, "Any chills?");
    assert!(session.in_dialogue());
    assert!(!reply.contains("nearest hospital"));
}

#[tokio::test]
async fn test_diagnosis_request_is_redirected_without_classifier() {
    let llm = Arc::new(MockLlm::new(true));
    let mut session = ConversationSession::new(test_state(Arc::clone(&llm)));

    let reply = session
        .handle_utterance("I have a fever, what disease do I have?", Some("en-IN"))
        .await
        .unwrap();

    assert!(reply.contains("cannot provide a medical diagnosis"));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_disease_info_gets_answer_with_disclaimer() {
    let llm = Arc::new(
        MockLlm::new(true)
            .with_classifier_reply(r#"{"intent": "disease_info", "confidence": 0.9, "entities": [{"text": "diabetes", "entity_type": "disease"}]}"#),
    );
    let state = test_state(Arc::clone(&llm));
    let mut session = ConversationSession::new(Arc::clone(&state));

    let reply = session
        .handle_utterance("Tell me about diabetes", Some("en-IN"))
        .await
        .unwrap();

    assert!(reply.starts_with("Diabetes is a long-term condition"));
    assert!(reply.ends_with(state.languages.disclaimer("en-IN")));
    assert!(!session.in_dialogue());
    assert!(llm.system_prompts.lock().unwrap()[1].contains("HealHub Assistant"));
}

#[tokio::test]
async fn test_unmatched_symptom_goes_straight_to_assessment() {
    let llm = Arc::new(MockLlm::new(false));
    let mut session = ConversationSession::new(test_state(Arc::clone(&llm)));

    let reply = session
        .handle_utterance("I have a rash", Some("en-IN"))
        .await
        .unwrap();

    assert!(reply.contains(DEFAULT_ASSESSMENT_SUMMARY));
    assert!(!session.in_dialogue());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_hindi_query_is_analysed_in_english_and_answered_in_hindi() {
    let mut session = ConversationSession::new(test_state(Arc::new(MockLlm::new(false))));

    let reply = session.handle_utterance("मुझे बुखार है", None).await.unwrap();

    assert_eq!(session.language(), Some("hi-IN"));
    assert_eq!(reply, "[hi-IN] How high is the fever?");
    assert_eq!(session.pending_question().unwrap().symptom_name, "fever");
}

#[tokio::test]
async fn test_native_emergency_survives_lossy_translation() {
    let mut session = ConversationSession::new(test_state(Arc::new(MockLlm::new(false))));

    let reply = session
        .handle_utterance("मुझे सीने में दर्द है", None)
        .await
        .unwrap();

    assert!(reply.starts_with("आपके द्वारा बताए गए लक्षण गंभीर"));
    assert!(!session.in_dialogue());
}
