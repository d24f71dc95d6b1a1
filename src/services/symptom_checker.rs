use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::models::{
    AssessmentResult, DialoguePhase, DialogueState, MedicalEntity, NluResult, PendingQuestion,
    SymptomKb, SymptomKbEntry,
};
use crate::services::assessment::AssessmentSynthesizer;

/// Follow-up dialogue for one conversation: matches entities against the KB, schedules
/// questions, records answers and hands the result to the synthesizer.
pub struct SymptomChecker {
    kb: Arc<SymptomKb>,
    nlu_result: NluResult,
    synthesizer: AssessmentSynthesizer,
    state: DialogueState,
    phase: DialoguePhase,
    asked: HashSet<PendingQuestion>,
}

impl SymptomChecker {
    pub fn new(kb: Arc<SymptomKb>, nlu_result: NluResult, synthesizer: AssessmentSynthesizer) -> Self {
        Self {
            kb,
            nlu_result,
            synthesizer,
            state: DialogueState::default(),
            phase: DialoguePhase::Idle,
            asked: HashSet::new(),
        }
    }

    pub fn state(&self) -> &DialogueState {
        &self.state
    }

    pub fn phase(&self) -> DialoguePhase {
        self.phase
    }

    pub fn nlu_result(&self) -> &NluResult {
        &self.nlu_result
    }

    /// KB entries for `entities`: exact key match first, then keyword containment.
    /// Unmatched entities are dropped; each KB entry appears at most once.
    pub fn identify_relevant_symptoms<'a>(&'a self, entities: &[MedicalEntity]) -> Vec<&'a SymptomKbEntry> {
        match_entities(&self.kb, entities)
    }

    /// Rebuilds the pending queue from the current entities, skipping symptoms that already
    /// have answers and questions that were already handed out.
    pub fn prepare_follow_up_questions(&mut self) {
        let kb = Arc::clone(&self.kb);
        let relevant = match_entities(&kb, &self.nlu_result.entities);

        let mut queue = VecDeque::new();
        for entry in relevant {
            let symptom_name = entry.key();
            if self.state.has_details_for(&symptom_name) {
                tracing::debug!(symptom = %symptom_name, "symptom already has answers, not scheduling");
                continue;
            }
            for question in &entry.follow_up_questions {
                let pending = PendingQuestion {
                    symptom_name: symptom_name.clone(),
                    question: question.clone(),
                };
                if !self.asked.contains(&pending) {
                    queue.push_back(pending);
                }
            }
        }

        self.state.pending_follow_up_questions = queue;
        self.phase = if self.state.pending_follow_up_questions.is_empty() {
            DialoguePhase::Exhausted
        } else {
            DialoguePhase::Scheduling
        };
        tracing::info!(
            pending = self.state.pending_follow_up_questions.len(),
            phase = self.phase.as_str(),
            "scheduled follow-up questions"
        );
    }

    /// FIFO pop. `None` means the dialogue is exhausted.
    pub fn get_next_question(&mut self) -> Option<PendingQuestion> {
        match self.state.pending_follow_up_questions.pop_front() {
            Some(next) => {
                self.asked.insert(next.clone());
                self.phase = DialoguePhase::AwaitingAnswer;
                Some(next)
            }
            None => {
                self.phase = DialoguePhase::Exhausted;
                None
            }
        }
    }

    /// Last write wins for a repeated question.
    pub fn record_answer(&mut self, symptom_name: &str, question: &str, answer: &str) {
        let symptom = symptom_name.trim().to_lowercase();
        tracing::debug!(symptom = %symptom, "recording answer");
        self.state
            .collected_symptom_details
            .entry(symptom)
            .or_default()
            .insert(question.to_string(), answer.to_string());
        if self.phase == DialoguePhase::AwaitingAnswer {
            self.phase = DialoguePhase::Scheduling;
        }
    }

    /// Triage points of every answered symptom, in KB order, without repeats.
    pub fn collected_triage_points(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.kb
            .entries()
            .iter()
            .filter(|entry| self.state.has_details_for(&entry.key()))
            .flat_map(|entry| entry.basic_triage_points.iter())
            .filter(|point| seen.insert(point.as_str()))
            .cloned()
            .collect()
    }

    pub async fn generate_preliminary_assessment(&self) -> AssessmentResult {
        let triage_points = self.collected_triage_points();
        self.synthesizer
            .synthesize(&self.state.collected_symptom_details, &triage_points)
            .await
    }
}

fn match_entities<'a>(kb: &'a SymptomKb, entities: &[MedicalEntity]) -> Vec<&'a SymptomKbEntry> {
    let mut matched: Vec<&SymptomKbEntry> = Vec::new();

    for entity in entities {
        let text = entity.normalized_text();
        if text.is_empty() {
            continue;
        }

        let entry = kb.get(&text).or_else(|| {
            kb.entries()
                .iter()
                .find(|entry| entry.keywords.iter().any(|k| text.contains(k.as_str())))
        });

        match entry {
            Some(entry) if !matched.iter().any(|m| std::ptr::eq(*m, entry)) => {
                tracing::debug!(entity = %text, symptom = %entry.symptom_name, "entity matched knowledge base");
                matched.push(entry);
            }
            Some(_) => {}
            None => tracing::debug!(entity = %text, "entity has no knowledge base entry"),
        }
    }

    matched
}
