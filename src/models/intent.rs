use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HealthIntent {
    SymptomQuery,
    DiseaseInfo,
    DiagnosisRequest,
    TreatmentRequest,
    Emergency,
    Unknown,
}

impl HealthIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthIntent::SymptomQuery => "symptom_query",
            HealthIntent::DiseaseInfo => "disease_info",
            HealthIntent::DiagnosisRequest => "diagnosis_request",
            HealthIntent::TreatmentRequest => "treatment_request",
            HealthIntent::Emergency => "emergency",
            HealthIntent::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "symptom_query" => HealthIntent::SymptomQuery,
            "disease_info" => HealthIntent::DiseaseInfo,
            "diagnosis_request" => HealthIntent::DiagnosisRequest,
            "treatment_request" => HealthIntent::TreatmentRequest,
            "emergency" => HealthIntent::Emergency,
            _ => HealthIntent::Unknown,
        }
    }

    /// Higher wins when two intents compete for the same utterance.
    pub fn safety_rank(&self) -> u8 {
        match self {
            HealthIntent::Emergency => 5,
            HealthIntent::DiagnosisRequest => 4,
            HealthIntent::TreatmentRequest => 3,
            HealthIntent::DiseaseInfo => 2,
            HealthIntent::SymptomQuery => 1,
            HealthIntent::Unknown => 0,
        }
    }

    /// Intents whose answer is a safety redirect rather than information.
    pub fn is_redirect(&self) -> bool {
        matches!(
            self,
            HealthIntent::Emergency | HealthIntent::DiagnosisRequest | HealthIntent::TreatmentRequest
        )
    }
}

/// A tagged span of the utterance. Positions are character offsets, `end_pos` exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalEntity {
    pub text: String,
    pub entity_type: String,
    pub confidence: f32,
    pub start_pos: usize,
    pub end_pos: usize,
}

impl MedicalEntity {
    pub fn normalized_text(&self) -> String {
        self.text.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NluResult {
    pub original_text: String,
    pub intent: HealthIntent,
    pub entities: Vec<MedicalEntity>,
    pub confidence: f32,
    pub is_emergency: bool,
    pub requires_disclaimer: bool,
    pub language_detected: String,
}

impl NluResult {
    pub fn unknown(text: &str, language: &str) -> Self {
        Self {
            original_text: text.to_string(),
            intent: HealthIntent::Unknown,
            entities: Vec::new(),
            confidence: 0.0,
            is_emergency: false,
            requires_disclaimer: true,
            language_detected: language.to_string(),
        }
    }

    pub fn entities_of_type<'a>(
        &'a self,
        entity_type: &'a str,
    ) -> impl Iterator<Item = &'a MedicalEntity> + 'a {
        self.entities
            .iter()
            .filter(move |e| e.entity_type == entity_type)
    }
}
