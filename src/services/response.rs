use std::fmt::Write as _;
use std::sync::Arc;

use crate::config::LanguageConfig;
use crate::models::{AssessmentResult, HealthIntent, NluResult, SafetyCheck};
use crate::services::ai::nlu::detect_emergency;
use crate::services::ai::{CallOutcome, LlmProvider, Message};
use crate::services::translation::{translate_or_passthrough, Translator};

const HEALTHCARE_SYSTEM_PROMPT: &str = r#"You are HealHub Assistant, a careful source of general health information for users in India.

Rules:
- Reply in the same language as the user's message, in simple words.
- Give general, widely accepted health information only. Do not speculate.
- Never diagnose. If asked what illness someone has, decline and suggest a qualified healthcare professional.
- Never recommend specific treatments, medicines or dosages. Suggest consulting a doctor instead.
- If the message describes a possible emergency, tell the user to go to the nearest hospital or contact a doctor immediately.
- Do not ask for or repeat personal details.
- Keep answers short and organised; use bullet points for lists.
"#;

const GENERAL_INFO_FALLBACK: &str = "I'm sorry, I can't answer that right now. For any health concern, please consult a qualified healthcare professional.";

const EMERGENCY_REDIRECT_EN: &str = "The symptoms you're describing sound serious and may require immediate medical attention. Please consult a doctor or go to the nearest hospital right away. I am not equipped to provide emergency medical assistance.";
const EMERGENCY_REDIRECT_HI: &str = "आपके द्वारा बताए गए लक्षण गंभीर लग रहे हैं और इसके लिए तत्काल चिकित्सा ध्यान देने की आवश्यकता हो सकती है। कृपया तुरंत डॉक्टर से सलाह लें या नजदीकी अस्पताल जाएँ। मैं आपातकालीन चिकित्सा सहायता प्रदान करने के लिए सुसज्जित नहीं हूँ।";

const DIAGNOSIS_REDIRECT_EN: &str = "I understand you're looking for answers, but I cannot provide a medical diagnosis. For any health concerns or to get a diagnosis, it's very important to consult a qualified healthcare professional.";
const DIAGNOSIS_REDIRECT_HI: &str = "मैं समझता/सकती हूँ कि आप उत्तर ढूंढ रहे हैं, लेकिन मैं मेडिकल निदान प्रदान नहीं कर सकता/सकती। किसी भी स्वास्थ्य चिंता या निदान के लिए, कृपया एक योग्य स्वास्थ्य पेशेवर से सलाह लें।";

const TREATMENT_REDIRECT_EN: &str = "I am unable to offer treatment advice or suggest specific medications. Please consult with your doctor or a qualified healthcare provider for any questions about treatments, medications, or managing your health condition.";
const TREATMENT_REDIRECT_HI: &str = "मैं उपचार सलाह या विशिष्ट दवाएं सुझाने में असमर्थ हूँ। उपचार, दवाओं या अपनी स्वास्थ्य स्थिति के प्रबंधन के बारे में किसी भी प्रश्न के लिए, कृपया अपने डॉक्टर या एक योग्य स्वास्थ्य सेवा प्रदाता से सलाह लें।";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Redirect {
    Emergency,
    Diagnosis,
    Treatment,
}

/// Native template for `language`, or the English one. The flag says whether it is native.
fn redirect_template(kind: Redirect, language: &str) -> (&'static str, bool) {
    let hindi = language == "hi-IN";
    let (en, hi) = match kind {
        Redirect::Emergency => (EMERGENCY_REDIRECT_EN, EMERGENCY_REDIRECT_HI),
        Redirect::Diagnosis => (DIAGNOSIS_REDIRECT_EN, DIAGNOSIS_REDIRECT_HI),
        Redirect::Treatment => (TREATMENT_REDIRECT_EN, TREATMENT_REDIRECT_HI),
    };
    if hindi {
        (hi, true)
    } else {
        (en, language.starts_with("en"))
    }
}

fn redirect_kind(nlu: &NluResult) -> Option<Redirect> {
    if nlu.is_emergency {
        return Some(Redirect::Emergency);
    }
    match nlu.intent {
        HealthIntent::Emergency => Some(Redirect::Emergency),
        HealthIntent::DiagnosisRequest => Some(Redirect::Diagnosis),
        HealthIntent::TreatmentRequest => Some(Redirect::Treatment),
        _ => None,
    }
}

/// Emergency first, then diagnosis, then treatment.
pub fn safety_check(nlu: &NluResult) -> SafetyCheck {
    let detected_issues = detect_emergency(&nlu.original_text);
    match redirect_kind(nlu) {
        Some(kind) => SafetyCheck {
            is_emergency: kind == Redirect::Emergency,
            requires_redirect: true,
            message: redirect_template(kind, &nlu.language_detected).0.to_string(),
            detected_issues,
        },
        None => SafetyCheck {
            detected_issues,
            ..SafetyCheck::default()
        },
    }
}

fn entity_list(nlu: &NluResult, entity_type: &str) -> String {
    let mut names: Vec<String> = Vec::new();
    for entity in nlu.entities_of_type(entity_type) {
        let name = entity.normalized_text();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

/// Turns structured results into the user-facing message in the user's language.
pub struct ResponseComposer {
    languages: LanguageConfig,
    translator: Arc<dyn Translator>,
    llm: Arc<dyn LlmProvider>,
}

impl ResponseComposer {
    pub fn new(
        languages: LanguageConfig,
        translator: Arc<dyn Translator>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            languages,
            translator,
            llm,
        }
    }

    pub async fn localize(&self, text: &str, language: &str) -> String {
        translate_or_passthrough(self.translator.as_ref(), text, language).await
    }

    /// The redirect message for `nlu`, if one is required. It is the entire response.
    pub async fn safety_redirect(&self, nlu: &NluResult) -> Option<String> {
        let kind = redirect_kind(nlu)?;
        Some(self.redirect(kind, &nlu.language_detected).await)
    }

    pub async fn emergency_redirect(&self, language: &str) -> String {
        self.redirect(Redirect::Emergency, language).await
    }

    async fn redirect(&self, kind: Redirect, language: &str) -> String {
        let (template, native) = redirect_template(kind, language);
        if native {
            template.to_string()
        } else {
            self.localize(template, language).await
        }
    }

    pub async fn disclaimer(&self, language: &str) -> String {
        let configured = self.languages.disclaimer(language);
        if !configured.is_empty() {
            return configured.to_string();
        }
        let english = self.languages.disclaimer("en-IN");
        self.localize(english, language).await
    }

    pub async fn compose_assessment(&self, assessment: &AssessmentResult, language: &str) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "Preliminary assessment: {}", assessment.assessment_summary);
        let _ = writeln!(text, "Suggested severity: {}", assessment.suggested_severity);
        let _ = writeln!(text, "Recommended next steps: {}", assessment.recommended_next_steps);

        if !assessment.potential_warnings.is_empty() {
            text.push_str("Warning signs to watch for:\n");
            for warning in &assessment.potential_warnings {
                let _ = writeln!(text, "- {warning}");
            }
        }
        if !assessment.relevant_kb_triage_points.is_empty() {
            text.push_str("General guidance:\n");
            for point in &assessment.relevant_kb_triage_points {
                let _ = writeln!(text, "- {point}");
            }
        }
        let _ = write!(text, "\n{}", assessment.disclaimer);

        self.localize(&text, language).await
    }

    /// General-information answer for non-redirect, non-dialogue turns.
    pub async fn compose_general_info(&self, user_text: &str, nlu: &NluResult) -> String {
        let language = nlu.language_detected.as_str();

        let answer = if self.llm.has_credential() {
            let prompt = format!(
                "User query: {user_text}\nDetected intent: {}\nSymptoms mentioned: {}\nConditions mentioned: {}",
                nlu.intent.as_str(),
                entity_list(nlu, "symptom"),
                entity_list(nlu, "disease"),
            );
            CallOutcome::from_result(
                "general_info",
                self.llm
                    .chat(HEALTHCARE_SYSTEM_PROMPT, &[Message::user(prompt)])
                    .await,
            )
            .ok()
        } else {
            None
        };

        let mut reply = match answer {
            Some(answer) => answer.trim().to_string(),
            None => self.localize(GENERAL_INFO_FALLBACK, language).await,
        };

        if nlu.requires_disclaimer {
            let disclaimer = self.disclaimer(language).await;
            let _ = write!(reply, "\n\n{disclaimer}");
        }
        reply
    }
}
