use std::sync::Arc;

use super::classifier::UrgencyClassifier;
use super::escalation::{evaluate, normalize_ml_confidence, EscalationInput, EscalationPolicy};
use super::flags::resolve_flags;
use super::ollama::LlmClient;
use super::parser::{missing_sections, parse_triage_response, Section};
use super::prompt::{build_triage_prompt, TRIAGE_SYSTEM_PROMPT};
use super::types::{MlPrediction, PatientHistory, TriageRecord, TriageRequest, TriageResponse};
use crate::backend::TriageBackend;

/// Narrative used when the generator cannot be reached.
pub const FALLBACK_NARRATIVE: &str =
    "Patient presents with ENT-related symptoms. Further assessment needed.";

/// Turn a raw generator response into the final triage decision.
///
/// Pure: no I/O beyond logging. When the generator gave no recognizable
/// urgency, the classifier's label is used as the starting urgency.
pub fn decide(
    raw: &str,
    transcript: &str,
    history: &PatientHistory,
    prediction: MlPrediction,
    policy: EscalationPolicy,
) -> TriageResponse {
    let mut parsed = parse_triage_response(raw);

    // Free-form output with no headers at all is taken as the summary.
    if parsed.summary.is_empty() && missing_sections(raw).len() == Section::ALL.len() {
        parsed.summary = raw.trim().to_string();
    }

    let starting_urgency = if parsed.urgency_explicit {
        parsed.urgency
    } else {
        prediction.urgency
    };
    let ml_confidence = normalize_ml_confidence(prediction.confidence);

    let flags = resolve_flags(parsed.flags, transcript, starting_urgency);
    let outcome = evaluate(
        &EscalationInput {
            transcript,
            urgency: starting_urgency,
            flags: &flags,
            history: Some(history),
            ml_confidence,
        },
        policy,
    );

    tracing::info!(
        urgency = %outcome.decision.urgency,
        confidence = %outcome.decision.confidence,
        generator_urgency_explicit = parsed.urgency_explicit,
        rules = ?outcome.fired_rules,
        flag_count = flags.len(),
        "Triage decision made"
    );

    TriageResponse {
        summary: parsed.summary,
        urgency: outcome.decision.urgency,
        findings: parsed.findings,
        flags,
        reasoning: parsed.reasoning,
        ml_confidence,
        urgency_confidence: outcome.decision.confidence,
    }
}

/// Live triage pipeline:
/// history → prompt → generate → parse → flags → classify → escalate → persist
pub struct TriageEngine {
    llm: Box<dyn LlmClient>,
    model_name: String,
    classifier: Box<dyn UrgencyClassifier>,
    backend: Option<Arc<dyn TriageBackend>>,
    policy: EscalationPolicy,
}

impl TriageEngine {
    pub fn new(
        llm: Box<dyn LlmClient>,
        model_name: &str,
        classifier: Box<dyn UrgencyClassifier>,
    ) -> Self {
        Self {
            llm,
            model_name: model_name.to_string(),
            classifier,
            backend: None,
            policy: EscalationPolicy::default(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn TriageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn llm(&self) -> &dyn LlmClient {
        self.llm.as_ref()
    }

    fn generate(&self, transcript: &str, history: &PatientHistory) -> String {
        let prompt = build_triage_prompt(transcript, history);
        match self.llm.generate(&self.model_name, &prompt, TRIAGE_SYSTEM_PROMPT) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Generation failed, using fallback narrative");
                FALLBACK_NARRATIVE.to_string()
            }
        }
    }

    /// Classify one call. Never fails: collaborator errors degrade.
    pub fn triage(&self, request: &TriageRequest) -> TriageResponse {
        tracing::info!(
            transcript_len = request.transcript.len(),
            "Triage request received"
        );

        let history = self
            .backend
            .as_ref()
            .map(|b| b.patient_history(&request.patient_id))
            .unwrap_or_default();

        let raw = self.generate(&request.transcript, &history);
        let prediction = self.classifier.predict(&request.transcript);
        let response = decide(&raw, &request.transcript, &history, prediction, self.policy);

        if let Some(backend) = &self.backend {
            let record = TriageRecord {
                patient_id: request.patient_id.clone(),
                transcript: request.transcript.clone(),
                summary: response.summary.clone(),
                urgency: response.urgency,
                confidence: response.ml_confidence,
            };
            if let Err(e) = backend.save_triage(&record) {
                tracing::error!(error = %e, "Failed to persist triage case");
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::pipeline::triage::classifier::{FixedClassifier, UnavailableClassifier};
    use crate::pipeline::triage::ollama::MockLlmClient;
    use crate::pipeline::triage::types::{Confidence, Flag, FlagTag, Urgency};

    const ROUTINE_RESPONSE: &str = "SUMMARY: Mild sore throat for two days, improving.\n\
        FINDINGS:\n- sore throat\n- improving\n\
        FLAGS: [SYMPTOM] sore throat, [PROGRESSION] improving\n\
        URGENCY: routine\n\
        REASONING: Mild and improving symptoms.";

    fn prediction(urgency: Urgency, confidence: f32) -> MlPrediction {
        MlPrediction { urgency, confidence }
    }

    #[test]
    fn decide_uses_parsed_fields() {
        let r = decide(
            ROUTINE_RESPONSE,
            "Mild sore throat for two days, improving.",
            &PatientHistory::default(),
            prediction(Urgency::Routine, 0.85),
            EscalationPolicy::default(),
        );
        assert_eq!(r.summary, "Mild sore throat for two days, improving.");
        assert_eq!(r.urgency, Urgency::Routine);
        assert_eq!(r.urgency_confidence, Confidence::High);
        assert_eq!(r.findings, vec!["sore throat", "improving"]);
        assert_eq!(r.flags.len(), 2);
        assert_eq!(r.reasoning, "Mild and improving symptoms.");
        assert_eq!(r.ml_confidence, 0.85);
    }

    #[test]
    fn decide_falls_back_to_keyword_flags() {
        let raw = "SUMMARY: Ear pain.\nURGENCY: routine\nREASONING: Mild.";
        let r = decide(
            raw,
            "Ear pain since Monday",
            &PatientHistory::default(),
            prediction(Urgency::Routine, 0.7),
            EscalationPolicy::default(),
        );
        assert_eq!(r.flags, vec![Flag::new(FlagTag::Symptom, "ear pain")]);
    }

    #[test]
    fn critical_transcript_overrides_generator() {
        let r = decide(
            ROUTINE_RESPONSE,
            "I can't breathe, my throat is swollen, I have a fever.",
            &PatientHistory::default(),
            prediction(Urgency::Routine, 0.9),
            EscalationPolicy::default(),
        );
        assert_eq!(r.urgency, Urgency::Urgent);
        assert_eq!(r.urgency_confidence, Confidence::High);
    }

    #[test]
    fn missing_urgency_starts_from_classifier_label() {
        let raw = "SUMMARY: Sinus pressure.\nREASONING: Unclear.";
        let r = decide(
            raw,
            "Sinus pressure for a week",
            &PatientHistory::default(),
            prediction(Urgency::SemiUrgent, 0.7),
            EscalationPolicy::default(),
        );
        assert_eq!(r.urgency, Urgency::SemiUrgent);
        assert_eq!(r.urgency_confidence, Confidence::Medium);
    }

    #[test]
    fn headerless_output_becomes_summary() {
        let r = decide(
            FALLBACK_NARRATIVE,
            "Ear itch",
            &PatientHistory::default(),
            MlPrediction::unavailable(),
            EscalationPolicy::default(),
        );
        assert_eq!(r.summary, FALLBACK_NARRATIVE);
        assert_eq!(r.urgency, Urgency::Routine);
        assert_eq!(r.ml_confidence, 0.0);
        assert_eq!(r.flags, vec![Flag::new(FlagTag::Severity, "mild symptoms")]);
    }

    #[test]
    fn decide_clamps_classifier_confidence() {
        let r = decide(
            ROUTINE_RESPONSE,
            "Mild sore throat",
            &PatientHistory::default(),
            prediction(Urgency::Routine, f32::NAN),
            EscalationPolicy::default(),
        );
        assert_eq!(r.ml_confidence, 0.0);
    }

    #[test]
    fn engine_uses_history_and_persists() {
        let backend = Arc::new(InMemoryBackend::new().with_history(
            "p-7",
            PatientHistory {
                medical_history: vec!["HIV".into()],
                ..Default::default()
            },
        ));
        let engine = TriageEngine::new(
            Box::new(MockLlmClient::new(ROUTINE_RESPONSE)),
            "ent-triage",
            Box::new(FixedClassifier(prediction(Urgency::Routine, 0.7))),
        )
        .with_backend(backend.clone());

        let response = engine.triage(&TriageRequest {
            patient_id: "p-7".into(),
            transcript: "Mild sore throat for two days, improving.".into(),
        });
        assert_eq!(response.urgency, Urgency::SemiUrgent);
        assert_eq!(response.urgency_confidence, Confidence::Medium);

        let saved = backend.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].patient_id, "p-7");
        assert_eq!(saved[0].urgency, Urgency::SemiUrgent);
        assert_eq!(saved[0].summary, response.summary);
        assert_eq!(saved[0].confidence, 0.7);
    }

    #[test]
    fn engine_survives_generator_and_backend_failure() {
        let engine = TriageEngine::new(
            Box::new(MockLlmClient::failing("down")),
            "ent-triage",
            Box::new(UnavailableClassifier),
        )
        .with_backend(Arc::new(InMemoryBackend::failing()));

        let response = engine.triage(&TriageRequest {
            patient_id: "p-1".into(),
            transcript: "Runny nose".into(),
        });
        assert_eq!(response.summary, FALLBACK_NARRATIVE);
        assert_eq!(response.urgency, Urgency::Routine);
        assert_eq!(response.flags, vec![Flag::new(FlagTag::Symptom, "runny nose")]);
    }

    #[test]
    fn engine_without_backend_skips_persistence() {
        let engine = TriageEngine::new(
            Box::new(MockLlmClient::new(ROUTINE_RESPONSE)),
            "ent-triage",
            Box::new(UnavailableClassifier),
        );
        let response = engine.triage(&TriageRequest {
            patient_id: "p-1".into(),
            transcript: "Mild sore throat".into(),
        });
        assert_eq!(response.urgency, Urgency::Routine);
        assert_eq!(engine.model_name(), "ent-triage");
    }
}
