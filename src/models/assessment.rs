use serde::{Deserialize, Serialize};

pub const CANONICAL_DISCLAIMER: &str = "This is a preliminary assessment based on the information you provided and is not a medical diagnosis. It is not a substitute for professional medical advice, diagnosis, or treatment. Always consult a qualified healthcare professional about your symptoms.";

pub const DEFAULT_ASSESSMENT_SUMMARY: &str =
    "Could not generate a preliminary assessment at this time.";
pub const DEFAULT_SUGGESTED_SEVERITY: &str = "Unknown";
pub const DEFAULT_NEXT_STEPS: &str =
    "Please consult a qualified healthcare professional for an evaluation of your symptoms.";

/// Fields a synthesized assessment must carry to be trusted.
pub const REQUIRED_ASSESSMENT_FIELDS: [&str; 5] = [
    "assessment_summary",
    "suggested_severity",
    "recommended_next_steps",
    "potential_warnings",
    "disclaimer",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentResult {
    pub assessment_summary: String,
    pub suggested_severity: String,
    pub recommended_next_steps: String,
    pub potential_warnings: Vec<String>,
    pub disclaimer: String,
    #[serde(default)]
    pub relevant_kb_triage_points: Vec<String>,
}

impl AssessmentResult {
    /// The canonical fallback (`DEFAULT_ASSESSMENT_ERROR`), returned whenever synthesis
    /// cannot be trusted.
    pub fn default_error() -> Self {
        Self {
            assessment_summary: DEFAULT_ASSESSMENT_SUMMARY.to_string(),
            suggested_severity: DEFAULT_SUGGESTED_SEVERITY.to_string(),
            recommended_next_steps: DEFAULT_NEXT_STEPS.to_string(),
            potential_warnings: Vec::new(),
            disclaimer: CANONICAL_DISCLAIMER.to_string(),
            relevant_kb_triage_points: Vec::new(),
        }
    }

    pub fn is_default_error(&self) -> bool {
        self.assessment_summary == DEFAULT_ASSESSMENT_SUMMARY
    }
}
