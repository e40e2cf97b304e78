//! Deterministic synthetic evaluation set.
//!
//! Transcripts are drawn from fixed pools with a seeded RNG, so the same
//! arguments always produce the same file. Reference summaries are derived
//! by rule from the transcript and are correct by construction; two extra
//! rows carry deliberately unfaithful and irrelevant summaries so the
//! metrics have something to catch.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::dataset::EvalRecord;
use crate::pipeline::triage::Urgency;

pub const DEFAULT_SEED: u64 = 42;

static ROUTINE_POOL: &[&str] = &[
    "Patient has mild sore throat for 2 days. No fever. Improving with tea and rest.",
    "Caller: My son has a runny nose and mild cough. No fever for 48 hours. He's eating and playing. Just checking if we need to come in.",
    "I've had congestion and a mild headache for five days. No fever, no facial pain. OTC helps a bit.",
    "Mild ear pressure since a flight 4 days ago. No pain, no discharge. Hearing is fine. It's improving.",
    "Hoarse voice for three days after a cold. No trouble swallowing or breathing. Resting voice helps.",
    "Patient reports mild sore throat and swollen glands for three days. No fever. Can swallow fine. A bit better than yesterday.",
];

static SEMI_URGENT_POOL: &[&str] = &[
    "Sore throat and fever 101 for three days. Getting worse. Can swallow but it hurts. No trouble breathing. Need to be seen soon.",
    "Bad ear pain and fluid from the ear. Low-grade fever. Two days. Pain is significant. Need an appointment.",
    "Severe sinus pain and pressure for a week. Getting worse when I bend forward. Congestion and yellowish discharge. No fever. Had something similar before.",
    "Daughter age 8 has high fever and very sore throat. Drinking but crying when she swallows. No breathing problems. Two days. Need to be seen soon.",
];

static URGENT_POOL: &[&str] = &[
    "Child has trouble breathing and is making a high-pitched noise when he breathes. Bad sore throat. He's 4. We're on the way to the ER.",
    "Sudden complete hearing loss in my right ear this morning. No trauma. No sound at all on that side.",
    "I'm immunocompromised on chemo. Severe sore throat and fever 103. Getting worse. I need to be seen today.",
];

const UNFAITHFUL_SUFFIX: &str = " Patient has diabetes and high fever.";
const IRRELEVANT_SUMMARY: &str =
    "The weather today is fine. Patient likes apples. Scheduling is available next week. Thank you for calling.";

/// How many transcripts to draw per urgency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticConfig {
    pub routine: usize,
    pub semi_urgent: usize,
    pub urgent: usize,
    pub include_bad_examples: bool,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            routine: 10,
            semi_urgent: 6,
            urgent: 4,
            include_bad_examples: true,
            seed: DEFAULT_SEED,
        }
    }
}

/// Rule-derived reference summary for a transcript.
pub fn reference_summary(transcript: &str, urgency: Urgency) -> String {
    let t = transcript.to_lowercase();
    let mut parts: Vec<&str> = Vec::new();

    if t.contains("throat") {
        parts.push("Patient reports throat symptoms.");
    }
    if t.contains("ear") {
        parts.push("Ear symptoms noted.");
    }
    if t.contains("no fever") {
        parts.push("No fever.");
    } else if t.contains("fever") {
        parts.push("Fever present.");
    }
    if t.contains("mild") {
        parts.push("Mild severity.");
    }
    if t.contains("severe") {
        parts.push("Severe symptoms.");
    }
    if t.contains("improving") {
        parts.push("Improving trend.");
    }
    if t.contains("worsen") || t.contains("getting worse") {
        parts.push("Worsening trend.");
    }
    if t.contains("day") || t.contains("week") {
        parts.push("Duration documented.");
    }
    if t.contains("breathing") && !t.contains("no trouble breathing") && !t.contains("no breathing") {
        parts.push("Breathing difficulty or concern.");
    }
    if t.contains("immunocompromised") || t.contains("chemo") {
        parts.push("Immunocompromised patient.");
    }
    if t.contains("sudden") && t.contains("hearing") {
        parts.push("Sudden hearing loss.");
    }
    if parts.is_empty() {
        parts.push("ENT-related symptoms from transcript.");
    }

    let urgency_line = format!("Urgency: {urgency}.");
    parts.push(&urgency_line);
    parts.join(" ")
}

fn record(transcript: &str, summary: String, urgency: Urgency, note: Option<&str>) -> EvalRecord {
    EvalRecord {
        transcript: transcript.to_string(),
        reference_summary: summary,
        urgency,
        expected_urgency: Some(urgency),
        note: note.map(str::to_string),
    }
}

/// Build the synthetic evaluation set.
pub fn generate_synthetic_eval(config: SyntheticConfig) -> Vec<EvalRecord> {
    let mut rng = StdRng::seed_from_u64(config.seed);

    let pools = [
        (ROUTINE_POOL, Urgency::Routine, config.routine),
        (SEMI_URGENT_POOL, Urgency::SemiUrgent, config.semi_urgent),
        (URGENT_POOL, Urgency::Urgent, config.urgent),
    ];

    let mut chosen: Vec<(&str, Urgency)> = Vec::new();
    for (pool, urgency, count) in pools {
        for _ in 0..count {
            if let Some(transcript) = pool.choose(&mut rng) {
                chosen.push((*transcript, urgency));
            }
        }
    }
    chosen.shuffle(&mut rng);

    let mut records: Vec<EvalRecord> = chosen
        .into_iter()
        .map(|(t, u)| record(t, reference_summary(t, u), u, None))
        .collect();

    if config.include_bad_examples {
        let transcript = ROUTINE_POOL[0];
        let unfaithful = format!(
            "{}{UNFAITHFUL_SUFFIX}",
            reference_summary(transcript, Urgency::Routine)
        );
        records.push(record(
            transcript,
            unfaithful,
            Urgency::Routine,
            Some("unfaithful_reference_for_testing"),
        ));
        records.push(record(
            transcript,
            IRRELEVANT_SUMMARY.to_string(),
            Urgency::Routine,
            Some("irrelevant_reference_for_testing"),
        ));
    }

    tracing::info!(records = records.len(), seed = config.seed, "Synthetic evaluation set generated");
    records
}
