pub mod ai;
pub mod assessment;
pub mod conversation;
pub mod language;
pub mod response;
pub mod speech;
pub mod symptom_checker;
pub mod translation;
