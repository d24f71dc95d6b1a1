use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;

use crate::config::LanguageConfig;
use crate::models::{HealthIntent, MedicalEntity, NluResult, SymptomKb};
use crate::services::ai::{extract_json_object, CallOutcome, LlmProvider, Message};
use crate::services::language::{self, LanguageDetector};

const CLASSIFIER_PROMPT: &str = r#"You are the language understanding layer of a health information assistant. Classify the user's message and extract medical entities.

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{
  "intent": "symptom_query|disease_info|diagnosis_request|treatment_request|emergency|unknown",
  "confidence": 0.0,
  "entities": [
    {"text": "exact words from the message", "entity_type": "symptom|disease|body_part|medication", "confidence": 0.0}
  ]
}

Intent rules:
- "symptom_query": The user describes symptoms they or someone else has
- "disease_info": The user asks for general information about a condition
- "diagnosis_request": The user asks what illness they have or whether something is serious
- "treatment_request": The user asks what medicine, dosage or remedy to use
- "emergency": The message describes a life-threatening situation
- "unknown": None of the above

Entity text must be copied exactly as it appears in the message.
"#;

/// Phrases that signal an emergency regardless of intent. Matched case-insensitively.
const EMERGENCY_PHRASES: &[&str] = &[
    "chest pain",
    "heart attack",
    "difficulty breathing",
    "trouble breathing",
    "can't breathe",
    "cannot breathe",
    "unable to breathe",
    "shortness of breath",
    "severe bleeding",
    "uncontrolled bleeding",
    "bleeding heavily",
    "won't stop bleeding",
    "unconscious",
    "loss of consciousness",
    "passed out",
    "stroke",
    "face drooping",
    "slurred speech",
    "sudden numbness",
    "sudden severe headache",
    "seizure",
    "suicide",
    "kill myself",
    "end my life",
    "want to die",
    "self-harm",
    "self harm",
    "hurt myself",
    "emergency",
    "सीने में दर्द",
    "सांस लेने में तकलीफ",
    "आत्महत्या",
];

const DIAGNOSIS_PHRASES: &[&str] = &[
    "what do i have",
    "is this serious",
    "is it serious",
    "do i have",
    "what could it be",
    "what is wrong with me",
    "what's wrong with me",
    "diagnose",
    "which disease",
    "what disease",
    "मुझे क्या हुआ है",
    "क्या यह गंभीर है",
];

const TREATMENT_PHRASES: &[&str] = &[
    "what should i take",
    "which medicine",
    "what medicine",
    "what medication",
    "which tablet",
    "how do i treat",
    "how to treat",
    "how to cure",
    "cure for",
    "home remedy",
    "home remedies",
    "dosage",
    "prescribe",
    "कौन सी दवा",
    "क्या दवा",
];

const ENTITY_LEXICON: &[(&str, &str)] = &[
    ("fever", "symptom"),
    ("high temperature", "symptom"),
    ("cough", "symptom"),
    ("headache", "symptom"),
    ("head pain", "symptom"),
    ("sore throat", "symptom"),
    ("runny nose", "symptom"),
    ("nausea", "symptom"),
    ("vomiting", "symptom"),
    ("diarrhea", "symptom"),
    ("diarrhoea", "symptom"),
    ("fatigue", "symptom"),
    ("tired", "symptom"),
    ("dizziness", "symptom"),
    ("dizzy", "symptom"),
    ("chest pain", "symptom"),
    ("shortness of breath", "symptom"),
    ("rash", "symptom"),
    ("body ache", "symptom"),
    ("stomach ache", "symptom"),
    ("stomach pain", "symptom"),
    ("back pain", "symptom"),
    ("chills", "symptom"),
    ("बुखार", "symptom"),
    ("खांसी", "symptom"),
    ("सिरदर्द", "symptom"),
    ("diabetes", "disease"),
    ("hypertension", "disease"),
    ("high blood pressure", "disease"),
    ("asthma", "disease"),
    ("covid", "disease"),
    ("covid-19", "disease"),
    ("malaria", "disease"),
    ("dengue", "disease"),
    ("typhoid", "disease"),
    ("tuberculosis", "disease"),
    ("influenza", "disease"),
    ("flu", "disease"),
    ("migraine", "disease"),
    ("common cold", "disease"),
];

const RULE_INTENT_CONFIDENCE: f32 = 0.9;
const RULE_ENTITY_CONFIDENCE: f32 = 0.8;
const FALLBACK_INTENT_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    intent: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    entities: Vec<ClassifierEntity>,
}

#[derive(Debug, Deserialize)]
struct ClassifierEntity {
    text: String,
    #[serde(default)]
    entity_type: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug)]
struct Classification {
    intent: HealthIntent,
    confidence: f32,
    entities: Vec<MedicalEntity>,
}

/// Words that cancel an emergency phrase shortly after them in the same clause.
const NEGATIONS: &[&str] = &[
    "no", "not", "never", "without", "don't", "dont", "don’t", "didn't", "haven't", "nahi",
];
const NEGATION_WINDOW: usize = 3;

/// A lexicon phrase compiled with word boundaries, kept for reporting.
struct PhrasePattern {
    phrase: &'static str,
    regex: Regex,
}

static EMERGENCY_PATTERNS: LazyLock<Vec<PhrasePattern>> =
    LazyLock::new(|| compile_phrases(EMERGENCY_PHRASES));
static DIAGNOSIS_PATTERNS: LazyLock<Vec<PhrasePattern>> =
    LazyLock::new(|| compile_phrases(DIAGNOSIS_PHRASES));
static TREATMENT_PATTERNS: LazyLock<Vec<PhrasePattern>> =
    LazyLock::new(|| compile_phrases(TREATMENT_PHRASES));

/// Whole-word for ASCII terms. Indic terms match as substrings since their
/// combining marks do not sit well with `\b`.
fn bounded(term: &str) -> String {
    let escaped = regex::escape(term);
    if term.is_ascii() {
        format!(r"\b{escaped}\b")
    } else {
        escaped
    }
}

fn compile_phrases(phrases: &[&'static str]) -> Vec<PhrasePattern> {
    phrases
        .iter()
        .filter_map(|&phrase| {
            Regex::new(&format!("(?i){}", bounded(phrase)))
                .ok()
                .map(|regex| PhrasePattern { phrase, regex })
        })
        .collect()
}

/// Emergency phrases found in `text`, in lexicon order.
pub fn detect_emergency(text: &str) -> Vec<String> {
    EMERGENCY_PATTERNS
        .iter()
        .filter(|p| p.regex.is_match(text))
        .map(|p| p.phrase.to_string())
        .collect()
}

/// Like `detect_emergency`, but skips mentions negated within their clause,
/// as in "no, no chest pain" or "I don't have chest pain".
pub fn detect_affirmed_emergency(text: &str) -> Vec<String> {
    EMERGENCY_PATTERNS
        .iter()
        .filter(|p| {
            p.regex
                .find_iter(text)
                .any(|m| !is_negated(&text[..m.start()]))
        })
        .map(|p| p.phrase.to_string())
        .collect()
}

fn is_negated(preceding: &str) -> bool {
    let clause = preceding
        .rsplit(|c: char| matches!(c, '.' | ';' | '!' | '?'))
        .next()
        .unwrap_or(preceding)
        .to_lowercase();
    clause
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty())
        .rev()
        .take(NEGATION_WINDOW)
        .take_while(|w| !matches!(*w, "but" | "however" | "now"))
        .any(|w| NEGATIONS.contains(&w))
}

/// Diagnosis or treatment phrasing. Diagnosis wins when both appear.
pub fn rule_intent(text: &str) -> Option<HealthIntent> {
    let mut candidates = Vec::new();
    if DIAGNOSIS_PATTERNS.iter().any(|p| p.regex.is_match(text)) {
        candidates.push(HealthIntent::DiagnosisRequest);
    }
    if TREATMENT_PATTERNS.iter().any(|p| p.regex.is_match(text)) {
        candidates.push(HealthIntent::TreatmentRequest);
    }
    candidates.into_iter().max_by_key(|i| i.safety_rank())
}

fn char_offset(text: &str, byte_idx: usize) -> usize {
    text[..byte_idx].chars().count()
}

fn build_entity_pattern(terms: &[String]) -> anyhow::Result<Regex> {
    let mut sorted: Vec<&String> = terms.iter().collect();
    // Longest first so "chest pain" beats any shorter term at the same position.
    sorted.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));

    let alternatives: Vec<String> = sorted.iter().map(|term| bounded(term)).collect();

    Ok(Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))?)
}

pub struct NluEngine {
    llm: Option<Arc<dyn LlmProvider>>,
    detector: Option<Arc<dyn LanguageDetector>>,
    languages: LanguageConfig,
    entity_pattern: Regex,
    entity_types: HashMap<String, String>,
}

impl NluEngine {
    /// Builds the rule layer from the built-in lexicon plus every KB symptom name and keyword.
    pub fn new(languages: LanguageConfig, kb: &SymptomKb) -> anyhow::Result<Self> {
        let mut entity_types: HashMap<String, String> = ENTITY_LEXICON
            .iter()
            .map(|(term, kind)| (term.to_string(), kind.to_string()))
            .collect();

        for entry in kb.entries() {
            for term in std::iter::once(entry.key()).chain(entry.keywords.iter().cloned()) {
                entity_types
                    .entry(term)
                    .or_insert_with(|| "symptom".to_string());
            }
        }

        let terms: Vec<String> = entity_types.keys().cloned().collect();
        let entity_pattern = build_entity_pattern(&terms)?;

        Ok(Self {
            llm: None,
            detector: None,
            languages,
            entity_pattern,
            entity_types,
        })
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn languages(&self) -> &LanguageConfig {
        &self.languages
    }

    pub async fn detect_language(&self, text: &str) -> String {
        language::detect_language(text, self.detector.as_deref(), &self.languages).await
    }

    /// Never fails: unresolvable text yields `Unknown` with zero confidence.
    pub async fn classify(&self, text: &str, language_hint: Option<&str>) -> NluResult {
        let hint = language_hint
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string);

        if text.trim().is_empty() {
            let language =
                hint.unwrap_or_else(|| self.languages.fallback_language().to_string());
            return NluResult::unknown(text, &language);
        }

        let language = match hint {
            Some(h) => h,
            None => self.detect_language(text).await,
        };

        let detected_issues = detect_emergency(text);
        let mut entities = self.extract_entities(text);

        let (mut intent, mut confidence) = match rule_intent(text) {
            Some(intent) => (intent, RULE_INTENT_CONFIDENCE),
            None => match self.classify_with_llm(text).await {
                CallOutcome::Success(classification) => {
                    entities.extend(classification.entities);
                    (classification.intent, classification.confidence)
                }
                CallOutcome::Degraded(_) => fallback_intent(&entities),
            },
        };

        let is_emergency = !detected_issues.is_empty() || intent == HealthIntent::Emergency;
        if is_emergency && intent == HealthIntent::Unknown {
            intent = HealthIntent::Emergency;
            confidence = RULE_INTENT_CONFIDENCE;
        }

        tracing::info!(
            intent = intent.as_str(),
            confidence,
            entities = entities.len(),
            is_emergency,
            language = %language,
            "classified utterance"
        );
        if is_emergency {
            tracing::warn!(issues = ?detected_issues, "emergency signals detected");
        }

        NluResult {
            original_text: text.to_string(),
            intent,
            entities,
            confidence,
            is_emergency,
            requires_disclaimer: !(is_emergency || intent.is_redirect()),
            language_detected: language,
        }
    }

    /// Lexicon matches as character-offset spans. Duplicates are kept.
    pub fn extract_entities(&self, text: &str) -> Vec<MedicalEntity> {
        self.entity_pattern
            .find_iter(text)
            .map(|m| {
                let matched = m.as_str();
                let entity_type = self
                    .entity_types
                    .get(&matched.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| "symptom".to_string());
                let start_pos = char_offset(text, m.start());
                MedicalEntity {
                    text: matched.to_string(),
                    entity_type,
                    confidence: RULE_ENTITY_CONFIDENCE,
                    start_pos,
                    end_pos: start_pos + matched.chars().count(),
                }
            })
            .collect()
    }

    async fn classify_with_llm(&self, text: &str) -> CallOutcome<Classification> {
        let Some(llm) = self.llm.as_ref() else {
            tracing::debug!("no classifier configured, using rule layer only");
            return CallOutcome::Degraded("no classifier configured".to_string());
        };
        if !llm.has_credential() {
            return CallOutcome::Degraded("classifier has no credential".to_string());
        }

        let response = match CallOutcome::from_result(
            "classify_intent",
            llm.chat(CLASSIFIER_PROMPT, &[Message::user(text)]).await,
        ) {
            CallOutcome::Success(response) => response,
            CallOutcome::Degraded(reason) => return CallOutcome::Degraded(reason),
        };

        match parse_classifier_response(&response, text) {
            Some(classification) => CallOutcome::Success(classification),
            None => {
                tracing::warn!("failed to parse classifier response, using rule layer");
                CallOutcome::Degraded("unparseable classifier response".to_string())
            }
        }
    }
}

fn parse_classifier_response(response: &str, text: &str) -> Option<Classification> {
    let value = extract_json_object(response)?;
    let parsed: ClassifierResponse = serde_json::from_value(value).ok()?;

    let intent = HealthIntent::parse(&parsed.intent);
    let confidence = match (intent, parsed.confidence) {
        (HealthIntent::Unknown, None) => 0.0,
        (_, Some(c)) => c.clamp(0.0, 1.0),
        (_, None) => FALLBACK_INTENT_CONFIDENCE,
    };

    let entities = parsed
        .entities
        .into_iter()
        .filter_map(|e| locate_entity(text, e))
        .collect();

    Some(Classification {
        intent,
        confidence,
        entities,
    })
}

/// Anchors a classifier entity to its first case-insensitive occurrence in the utterance.
/// Entities that do not occur verbatim are dropped.
fn locate_entity(text: &str, entity: ClassifierEntity) -> Option<MedicalEntity> {
    let needle = entity.text.trim();
    if needle.is_empty() {
        return None;
    }
    let pattern = Regex::new(&format!("(?i){}", regex::escape(needle))).ok()?;
    let Some(m) = pattern.find(text) else {
        tracing::debug!(entity = %needle, "classifier entity not found in utterance, dropping");
        return None;
    };
    let start_pos = char_offset(text, m.start());
    Some(MedicalEntity {
        text: m.as_str().to_string(),
        entity_type: entity
            .entity_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "symptom".to_string()),
        confidence: entity.confidence.unwrap_or(FALLBACK_INTENT_CONFIDENCE).clamp(0.0, 1.0),
        start_pos,
        end_pos: start_pos + m.as_str().chars().count(),
    })
}

fn fallback_intent(entities: &[MedicalEntity]) -> (HealthIntent, f32) {
    if entities.iter().any(|e| e.entity_type == "symptom") {
        (HealthIntent::SymptomQuery, FALLBACK_INTENT_CONFIDENCE)
    } else if entities.iter().any(|e| e.entity_type == "disease") {
        (HealthIntent::DiseaseInfo, FALLBACK_INTENT_CONFIDENCE)
    } else {
        (HealthIntent::Unknown, 0.0)
    }
}
