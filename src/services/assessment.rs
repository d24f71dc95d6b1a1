use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::models::{
    AssessmentResult, SymptomDetails, CANONICAL_DISCLAIMER, REQUIRED_ASSESSMENT_FIELDS,
};
use crate::services::ai::{parse_json_reply, CallOutcome, LlmProvider, Message};

const ASSESSMENT_PROMPT: &str = r#"You are a cautious health information assistant. You receive a user's answers to follow-up questions about their symptoms, plus general triage guidance from a knowledge base.

Write a short, non-diagnostic preliminary assessment. Never name a disease as the user's diagnosis and never recommend specific medications or dosages.

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{
  "assessment_summary": "plain-language summary of what the user reported",
  "suggested_severity": "one of: Likely mild | May require attention | Seek prompt medical care | Seek emergency care",
  "recommended_next_steps": "general next steps, always including when to see a doctor",
  "potential_warnings": ["warning signs the user should watch for"],
  "disclaimer": "a short disclaimer"
}
"#;

/// Turns collected answers into a trusted `AssessmentResult`, or the canonical fallback.
pub struct AssessmentSynthesizer {
    llm: Arc<dyn LlmProvider>,
}

impl AssessmentSynthesizer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub async fn synthesize(
        &self,
        collected_symptom_details: &SymptomDetails,
        triage_points: &[String],
    ) -> AssessmentResult {
        if !self.llm.has_credential() {
            tracing::warn!("no reasoning service credential configured, skipping assessment");
            return AssessmentResult::default_error();
        }

        let request = build_assessment_request(collected_symptom_details, triage_points);
        tracing::info!(
            symptoms = collected_symptom_details.len(),
            triage_points = triage_points.len(),
            "requesting preliminary assessment"
        );

        let outcome = CallOutcome::from_result(
            "synthesize_assessment",
            self.llm.chat(ASSESSMENT_PROMPT, &[Message::user(request)]).await,
        );

        match outcome {
            CallOutcome::Success(content) => validate_assessment_reply(&content, triage_points),
            CallOutcome::Degraded(_) => AssessmentResult::default_error(),
        }
    }
}

pub fn build_assessment_request(details: &SymptomDetails, triage_points: &[String]) -> String {
    let mut request = String::from("Collected symptom details:\n");

    if details.is_empty() {
        request.push_str("No symptom details were collected.\n");
    }
    for (symptom, answers) in details {
        let _ = writeln!(request, "Symptom: {symptom}");
        for (question, answer) in answers {
            let _ = writeln!(request, "- Q: {question}\n  A: {answer}");
        }
    }

    if !triage_points.is_empty() {
        request.push_str("\nKnowledge base triage guidance:\n");
        for point in triage_points {
            let _ = writeln!(request, "- {point}");
        }
    }

    request
}

/// Schema gate for the reasoning service's reply.
///
/// - unparseable or non-object reply, or JSON wrapped in prose: the fallback, unmodified
/// - missing or mistyped required field: the fallback, with one warning per offending key
///   and the KB triage points attached
/// - otherwise: the reply, with the canonical disclaimer and the KB triage points
pub fn validate_assessment_reply(content: &str, triage_points: &[String]) -> AssessmentResult {
    let Some(Value::Object(obj)) = parse_json_reply(content) else {
        tracing::warn!("assessment reply is not a JSON object, using fallback");
        return AssessmentResult::default_error();
    };

    let missing: Vec<&str> = REQUIRED_ASSESSMENT_FIELDS
        .iter()
        .copied()
        .filter(|key| !obj.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "assessment reply failed schema validation");
        return rejected(
            missing
                .iter()
                .map(|key| format!("LLM response missing key: {key}")),
            triage_points,
        );
    }

    let summary = string_field(&obj, "assessment_summary");
    let severity = string_field(&obj, "suggested_severity");
    let next_steps = string_field(&obj, "recommended_next_steps");
    let warnings = string_list_field(&obj, "potential_warnings");

    match (summary, severity, next_steps, warnings) {
        (Ok(summary), Ok(severity), Ok(next_steps), Ok(warnings)) => AssessmentResult {
            assessment_summary: summary,
            suggested_severity: severity,
            recommended_next_steps: next_steps,
            potential_warnings: warnings,
            disclaimer: CANONICAL_DISCLAIMER.to_string(),
            relevant_kb_triage_points: triage_points.to_vec(),
        },
        (summary, severity, next_steps, warnings) => {
            let invalid: Vec<&str> = [
                summary.err(),
                severity.err(),
                next_steps.err(),
                warnings.err(),
            ]
            .into_iter()
            .flatten()
            .collect();
            tracing::warn!(invalid = ?invalid, "assessment reply has mistyped fields");
            rejected(
                invalid
                    .iter()
                    .map(|key| format!("LLM response has invalid value for key: {key}")),
                triage_points,
            )
        }
    }
}

fn rejected(warnings: impl Iterator<Item = String>, triage_points: &[String]) -> AssessmentResult {
    let mut result = AssessmentResult::default_error();
    result.potential_warnings.extend(warnings);
    result.relevant_kb_triage_points = triage_points.to_vec();
    result
}

fn string_field<'a>(obj: &Map<String, Value>, key: &'a str) -> Result<String, &'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or(key)
}

fn string_list_field<'a>(obj: &Map<String, Value>, key: &'a str) -> Result<Vec<String>, &'a str> {
    let items = obj.get(key).and_then(Value::as_array).ok_or(key)?;
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or(key))
        .collect()
}
