//! Static keyword data for flag tagging, critical-term detection and
//! history risk assessment.
//!
//! Everything here is immutable and shared by all callers. Phrases are
//! lower-case; callers match against text passed through [`fold_case`].

use super::types::FlagTag;

// ── Flag dictionary ─────────────────────────────────────────

static SYMPTOM_PHRASES: &[&str] = &[
    "sore throat", "throat pain", "throat hurts", "ear pain", "earache",
    "ear pressure", "ear discharge", "fluid from the ear", "congestion",
    "stuffy nose", "blocked nose", "runny nose", "nasal discharge",
    "post nasal drip", "cough", "hoarse", "voice change", "sinus pain",
    "sinus pressure", "facial pain", "headache", "tinnitus", "ringing in",
    "muffled hearing", "nosebleed", "swollen glands",
];

static SEVERITY_PHRASES: &[&str] = &[
    "mild", "moderate", "severe", "unbearable", "excruciating",
    "significant", "slight", "out of 10",
];

static PROGRESSION_PHRASES: &[&str] = &[
    "worsening", "getting worse", "improving", "getting better",
    "a bit better", "stable", "rapid", "deteriorating", "sudden",
];

static RED_FLAG_PHRASES: &[&str] = &[
    "difficulty breathing", "trouble breathing", "can't breathe",
    "shortness of breath", "stridor", "wheezing", "airway", "drooling",
    "can't swallow", "unable to swallow", "dysphagia",
    "sudden hearing loss", "severe vertigo", "fainting",
    "facial swelling", "throat swelling", "neck swelling",
    "severe bleeding", "sepsis", "spreading",
];

static MEDICAL_HISTORY_PHRASES: &[&str] = &[
    "diabetes", "diabetic", "asthma", "copd", "immunocompromised",
    "chemo", "hiv", "cancer", "transplant", "heart disease",
    "had something similar", "history of", "tonsillectomy",
];

static DURATION_PHRASES: &[&str] = &[
    "since yesterday", "this morning", "couple of days", "few days",
    "for a week", "days", "weeks", "hours", "months",
];

static ASSOCIATED_SYMPTOM_PHRASES: &[&str] = &[
    "fever", "chills", "fatigue", "body aches", "headache", "dizziness",
    "dizzy", "vertigo", "nausea", "loss of smell", "bad breath",
    "swollen lymph",
];

static RELIEVING_FACTOR_PHRASES: &[&str] = &[
    "warm tea", "tea", "resting", "ibuprofen", "paracetamol",
    "acetaminophen", "tylenol", "lozenges", "otc", "over the counter",
    "steam", "saline", "helps",
];

static AGGRAVATING_FACTOR_PHRASES: &[&str] = &[
    "when i swallow", "swallowing", "bending forward", "bend forward",
    "lying down", "talking", "cold air", "flight", "flying", "eating",
    "at night",
];

/// Flag dictionary in declared tag order. Iteration order decides which
/// tag a keyword receives when it appears under more than one category.
pub static FLAG_DICTIONARY: &[(FlagTag, &[&str])] = &[
    (FlagTag::Symptom, SYMPTOM_PHRASES),
    (FlagTag::Severity, SEVERITY_PHRASES),
    (FlagTag::Progression, PROGRESSION_PHRASES),
    (FlagTag::RedFlag, RED_FLAG_PHRASES),
    (FlagTag::MedicalHistory, MEDICAL_HISTORY_PHRASES),
    (FlagTag::Duration, DURATION_PHRASES),
    (FlagTag::AssociatedSymptoms, ASSOCIATED_SYMPTOM_PHRASES),
    (FlagTag::RelievingFactors, RELIEVING_FACTOR_PHRASES),
    (FlagTag::AggravatingFactors, AGGRAVATING_FACTOR_PHRASES),
];

/// Phrases registered for one tag.
pub fn phrases_for(tag: FlagTag) -> &'static [&'static str] {
    FLAG_DICTIONARY
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, phrases)| *phrases)
        .unwrap_or(&[])
}

// ── Critical red-flag terms ─────────────────────────────────

/// Any of these in a transcript forces an urgent, high-confidence decision.
pub static CRITICAL_TERMS: &[&str] = &[
    // Breathing / airway
    "difficulty breathing", "breathing difficulty", "trouble breathing",
    "hard to breathe", "can't breathe", "cannot breathe",
    "struggling to breathe", "short of breath", "shortness of breath",
    "stridor", "high-pitched noise", "airway",
    // Pain
    "severe pain", "unbearable pain", "unbearable", "excruciating",
    "severe throat pain",
    // Swallowing
    "dysphagia", "can't swallow", "cannot swallow", "unable to swallow",
    // Hearing / balance
    "sudden hearing loss", "sudden loss of hearing", "severe vertigo",
    "severe dizziness", "fainting", "fainted", "passed out",
    // Infection / immune status
    "fever", "immunocompromised", "immunosuppressed", "chemo",
    "spreading infection", "infection is spreading", "sepsis", "septic",
    // Swelling
    "facial swelling", "face is swollen", "swollen face",
    "throat swelling", "swollen throat", "throat is swollen",
    "edema", "oedema",
    // Bleeding
    "severe bleeding", "heavy bleeding", "bleeding heavily",
    "won't stop bleeding",
];

// ── History risk factors ────────────────────────────────────

/// Category of a medical-history risk factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskCategory {
    Immunocompromised,
    Diabetes,
    LungDisease,
    HeartDisease,
    PriorEntComplications,
}

impl RiskCategory {
    /// Categories that make a patient high-risk. Immune status is tracked
    /// separately and is not part of this set.
    pub fn is_high_risk(&self) -> bool {
        !matches!(self, Self::Immunocompromised)
    }
}

pub static RISK_FACTORS: &[(RiskCategory, &[&str])] = &[
    (
        RiskCategory::Immunocompromised,
        &[
            "hiv", "immunocompromised", "immunosuppress", "immune deficiency",
            "chemo", "cancer", "transplant", "leukemia", "lymphoma",
        ],
    ),
    (RiskCategory::Diabetes, &["diabetes", "diabetic"]),
    (
        RiskCategory::LungDisease,
        &["asthma", "copd", "emphysema", "chronic bronchitis", "lung disease", "cystic fibrosis"],
    ),
    (
        RiskCategory::HeartDisease,
        &["heart disease", "heart failure", "coronary", "cardiac", "arrhythmia", "heart attack"],
    ),
    (
        RiskCategory::PriorEntComplications,
        &[
            "peritonsillar abscess", "quinsy", "epiglottitis", "mastoiditis",
            "deep neck infection", "airway obstruction", "ent surgery",
            "sinus surgery", "ent complication",
        ],
    ),
];

// ── Trend terms ─────────────────────────────────────────────

pub static WORSENING_TERMS: &[&str] = &[
    "worsening", "worse", "getting worse", "deteriorating", "rapid",
];

// ── Matching helpers ────────────────────────────────────────

/// Lower-case text and fold typographic apostrophes so "can’t" matches "can't".
pub fn fold_case(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

/// First term contained in `haystack` (already case-folded), if any.
pub fn first_match(haystack: &str, terms: &[&'static str]) -> Option<&'static str> {
    terms.iter().copied().find(|term| haystack.contains(term))
}
