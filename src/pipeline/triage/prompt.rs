use super::types::PatientHistory;

/// Placeholder used when a history list is empty.
const NONE_REPORTED: &str = "None reported";

pub const TRIAGE_SYSTEM_PROMPT: &str = r#"
You are an intake assistant for an ear, nose and throat (ENT) clinic. You read
what a patient said on the phone and sort the call into one of three urgency
levels so that a clinician can review it. You do not diagnose and you do not
give treatment advice.

URGENCY LEVELS:
- urgent: possible airway compromise, difficulty breathing, stridor, inability
  to swallow, sudden hearing loss, severe vertigo or fainting, facial or neck
  swelling, spreading infection, heavy bleeding.
- semi-urgent: symptoms that are worsening, lasting more than a week, moderate
  pain, fever with ENT symptoms, or any ENT complaint in a patient with a
  weakened immune system.
- routine: mild, stable or improving symptoms with no warning signs.

MEDICAL HISTORY:
- Immune suppression (HIV, chemotherapy, transplant, cancer) lowers the
  threshold: never leave such a patient at routine if symptoms are active.
- Diabetes, lung disease, heart disease and earlier ENT complications raise
  concern when symptoms are getting worse.

FLAG CATEGORIES:
SYMPTOM, SEVERITY, PROGRESSION, RED_FLAG, MEDICAL_HISTORY, DURATION,
ASSOCIATED_SYMPTOMS, RELIEVING_FACTORS, AGGRAVATING_FACTORS.

RULES:
1. Use only what the patient actually said and the history you are given.
2. If any warning sign is present, the urgency is urgent.
3. When unsure between two levels, pick the higher one.
4. Answer in the exact format requested, with nothing before or after it.
"#;

/// Render a history list for the prompt.
fn render_list(items: &[String]) -> String {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        NONE_REPORTED.to_string()
    } else {
        items.join(", ")
    }
}

/// Build the user prompt for one call.
pub fn build_triage_prompt(transcript: &str, history: &PatientHistory) -> String {
    let medical_history = render_list(&history.medical_history);
    let previous_visits = render_list(&history.previous_visits);
    let allergies = render_list(&history.allergies);

    format!(
        r#"<transcript>
{transcript}
</transcript>

Patient record:
- Medical history: {medical_history}
- Previous visits: {previous_visits}
- Allergies: {allergies}

Classify this call. Reply with exactly these five lines:

SUMMARY: <two or three sentences describing the complaint>
FINDINGS: <key findings, one per line>
FLAGS: <tagged keywords, e.g. [SYMPTOM] sore throat, [DURATION] 3 days, [SEVERITY] mild>
URGENCY: <routine | semi-urgent | urgent>
REASONING: <one short paragraph explaining the urgency>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_transcript() {
        let prompt = build_triage_prompt("My ear hurts", &PatientHistory::default());
        assert!(prompt.contains("<transcript>\nMy ear hurts\n</transcript>"));
    }

    #[test]
    fn empty_history_is_reported_as_none() {
        let prompt = build_triage_prompt("x", &PatientHistory::default());
        assert!(prompt.contains("- Medical history: None reported"));
        assert!(prompt.contains("- Previous visits: None reported"));
        assert!(prompt.contains("- Allergies: None reported"));
    }

    #[test]
    fn history_items_are_joined() {
        let history = PatientHistory {
            medical_history: vec!["Asthma".into(), "  ".into(), "Diabetes".into()],
            allergies: vec!["Penicillin".into()],
            previous_visits: vec![],
        };
        let prompt = build_triage_prompt("x", &history);
        assert!(prompt.contains("- Medical history: Asthma, Diabetes"));
        assert!(prompt.contains("- Allergies: Penicillin"));
        assert!(prompt.contains("- Previous visits: None reported"));
    }

    #[test]
    fn prompt_requests_every_section() {
        let prompt = build_triage_prompt("x", &PatientHistory::default());
        for header in ["SUMMARY:", "FINDINGS:", "FLAGS:", "URGENCY:", "REASONING:"] {
            assert!(prompt.contains(header), "missing {header}");
        }
    }

    #[test]
    fn system_prompt_names_levels_and_tags() {
        for level in ["urgent:", "semi-urgent:", "routine:"] {
            assert!(TRIAGE_SYSTEM_PROMPT.contains(level));
        }
        assert!(TRIAGE_SYSTEM_PROMPT.contains("RED_FLAG"));
        assert!(TRIAGE_SYSTEM_PROMPT.contains("AGGRAVATING_FACTORS"));
    }
}
