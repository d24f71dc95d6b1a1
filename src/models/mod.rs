pub mod assessment;
pub mod conversation;
pub mod dialogue;
pub mod intent;
pub mod symptom_kb;

pub use assessment::{AssessmentResult, CANONICAL_DISCLAIMER, REQUIRED_ASSESSMENT_FIELDS};
pub use conversation::{ConversationMessage, SafetyCheck};
pub use dialogue::{DialoguePhase, DialogueState, PendingQuestion, SymptomDetails};
pub use intent::{HealthIntent, MedicalEntity, NluResult};
pub use symptom_kb::{SymptomKb, SymptomKbEntry};
