use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PendingQuestion {
    pub symptom_name: String,
    pub question: String,
}

/// symptom (lower-cased) -> question -> answer
pub type SymptomDetails = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueState {
    pub collected_symptom_details: SymptomDetails,
    pub pending_follow_up_questions: VecDeque<PendingQuestion>,
}

impl DialogueState {
    pub fn has_details_for(&self, symptom: &str) -> bool {
        self.collected_symptom_details
            .contains_key(&symptom.trim().to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DialoguePhase {
    Idle,
    Scheduling,
    AwaitingAnswer,
    Exhausted,
}

impl DialoguePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialoguePhase::Idle => "idle",
            DialoguePhase::Scheduling => "scheduling",
            DialoguePhase::AwaitingAnswer => "awaiting_answer",
            DialoguePhase::Exhausted => "exhausted",
        }
    }
}
