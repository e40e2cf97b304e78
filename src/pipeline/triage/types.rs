use std::fmt;

use serde::{Deserialize, Serialize};

/// Triage priority of a patient encounter.
///
/// Variants are declared in ascending order so `Ord` gives
/// `Routine < SemiUrgent < Urgent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    #[default]
    Routine,
    SemiUrgent,
    Urgent,
}

impl Urgency {
    pub const ALL: [Urgency; 3] = [Urgency::Routine, Urgency::SemiUrgent, Urgency::Urgent];

    /// Wire label: `routine`, `semi-urgent` or `urgent`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::SemiUrgent => "semi-urgent",
            Self::Urgent => "urgent",
        }
    }

    /// Exact, case-insensitive label match. Returns `None` for anything else.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|u| u.as_str().eq_ignore_ascii_case(label))
    }

    /// Boundary normalization: unknown labels collapse to `Routine`.
    pub fn from_label_or_routine(label: &str) -> Self {
        Self::from_label(label).unwrap_or_else(|| {
            tracing::warn!(
                label_len = label.len(),
                "Unrecognized urgency label normalized to routine"
            );
            Self::Routine
        })
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence attached to a final urgency decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Band a classifier probability into a confidence level.
    pub fn from_score(score: f32) -> Self {
        if score >= 0.8 {
            Self::High
        } else if score >= 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a flag. Declaration order is the dictionary iteration order,
/// which decides the tag when one keyword appears under several categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagTag {
    Symptom,
    Severity,
    Progression,
    RedFlag,
    MedicalHistory,
    Duration,
    AssociatedSymptoms,
    RelievingFactors,
    AggravatingFactors,
}

impl FlagTag {
    pub const ALL: [FlagTag; 9] = [
        FlagTag::Symptom,
        FlagTag::Severity,
        FlagTag::Progression,
        FlagTag::RedFlag,
        FlagTag::MedicalHistory,
        FlagTag::Duration,
        FlagTag::AssociatedSymptoms,
        FlagTag::RelievingFactors,
        FlagTag::AggravatingFactors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symptom => "SYMPTOM",
            Self::Severity => "SEVERITY",
            Self::Progression => "PROGRESSION",
            Self::RedFlag => "RED_FLAG",
            Self::MedicalHistory => "MEDICAL_HISTORY",
            Self::Duration => "DURATION",
            Self::AssociatedSymptoms => "ASSOCIATED_SYMPTOMS",
            Self::RelievingFactors => "RELIEVING_FACTORS",
            Self::AggravatingFactors => "AGGRAVATING_FACTORS",
        }
    }

    /// Case-insensitive tag lookup; tolerates spaces or hyphens in place of `_`.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(&normalized))
    }
}

impl fmt::Display for FlagTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged keyword explaining a contributing factor to the decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub tag: FlagTag,
    pub keyword: String,
}

impl Flag {
    pub fn new(tag: FlagTag, keyword: impl Into<String>) -> Self {
        Self {
            tag,
            keyword: keyword.into(),
        }
    }

    /// Identity used for deduplication.
    pub fn dedup_key(&self) -> String {
        self.keyword.to_lowercase()
    }
}

/// Append `flag` unless a flag with the same case-insensitive keyword exists.
pub(crate) fn push_unique(flags: &mut Vec<Flag>, flag: Flag) -> bool {
    let key = flag.dedup_key();
    if flags.iter().any(|f| f.dedup_key() == key) {
        return false;
    }
    flags.push(flag);
    true
}

/// Patient history as served by the backend. All lists default to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientHistory {
    pub medical_history: Vec<String>,
    pub allergies: Vec<String>,
    pub previous_visits: Vec<String>,
}

impl PatientHistory {
    pub fn is_empty(&self) -> bool {
        self.medical_history.is_empty() && self.allergies.is_empty() && self.previous_visits.is_empty()
    }

    /// Medical history entries joined and lower-cased for substring matching.
    pub fn medical_history_text(&self) -> String {
        self.medical_history.join(" ").to_lowercase()
    }
}

/// Typed fields recovered from the generator's narrative output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParsedTriage {
    pub summary: String,
    pub findings: Vec<String>,
    pub flags: Vec<Flag>,
    pub urgency: Urgency,
    pub reasoning: String,
    /// False when `urgency` is the default because no recognized value was found.
    pub urgency_explicit: bool,
}

/// Final output of the escalation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyDecision {
    pub urgency: Urgency,
    pub confidence: Confidence,
}

impl UrgencyDecision {
    pub fn new(urgency: Urgency, confidence: Confidence) -> Self {
        Self { urgency, confidence }
    }

    pub fn with_confidence(self, confidence: Confidence) -> Self {
        Self { confidence, ..self }
    }
}

/// Output of the statistical classifier collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MlPrediction {
    pub urgency: Urgency,
    pub confidence: f32,
}

impl MlPrediction {
    /// Returned when no classifier is reachable.
    pub fn unavailable() -> Self {
        Self {
            urgency: Urgency::Routine,
            confidence: 0.0,
        }
    }
}

/// Incoming live triage request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRequest {
    pub patient_id: String,
    pub transcript: String,
}

/// Caller-facing triage response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResponse {
    pub summary: String,
    pub urgency: Urgency,
    pub findings: Vec<String>,
    pub flags: Vec<Flag>,
    pub reasoning: String,
    pub ml_confidence: f32,
    pub urgency_confidence: Confidence,
}

/// Payload handed to the persistence backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRecord {
    #[serde(rename = "patientID")]
    pub patient_id: String,
    pub transcript: String,
    #[serde(rename = "AISummary")]
    pub summary: String,
    #[serde(rename = "AIUrgency")]
    pub urgency: Urgency,
    #[serde(rename = "AIConfidence")]
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_orders_by_severity() {
        assert!(Urgency::Routine < Urgency::SemiUrgent);
        assert!(Urgency::SemiUrgent < Urgency::Urgent);
        assert_eq!(Urgency::default(), Urgency::Routine);
    }

    #[test]
    fn urgency_serializes_to_wire_labels() {
        let json = serde_json::to_string(&Urgency::SemiUrgent).unwrap();
        assert_eq!(json, "\"semi-urgent\"");
        let back: Urgency = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(back, Urgency::Urgent);
    }

    #[test]
    fn urgency_rejects_unknown_labels_on_deserialize() {
        assert!(serde_json::from_str::<Urgency>("\"emergency\"").is_err());
    }

    #[test]
    fn urgency_from_label_is_case_insensitive() {
        assert_eq!(Urgency::from_label(" Semi-Urgent "), Some(Urgency::SemiUrgent));
        assert_eq!(Urgency::from_label("semi urgent"), None);
        assert_eq!(Urgency::from_label_or_routine("critical"), Urgency::Routine);
        assert_eq!(Urgency::from_label_or_routine("URGENT"), Urgency::Urgent);
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(Confidence::from_score(0.95), Confidence::High);
        assert_eq!(Confidence::from_score(0.8), Confidence::High);
        assert_eq!(Confidence::from_score(0.6), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.59), Confidence::Low);
        assert_eq!(Confidence::from_score(0.0), Confidence::Low);
    }

    #[test]
    fn flag_tag_labels_round_trip() {
        for tag in FlagTag::ALL {
            assert_eq!(FlagTag::from_label(tag.as_str()), Some(tag));
        }
        assert_eq!(FlagTag::from_label("red flag"), Some(FlagTag::RedFlag));
        assert_eq!(FlagTag::from_label("symptoms"), None);
    }

    #[test]
    fn flag_serializes_tag_in_screaming_case() {
        let flag = Flag::new(FlagTag::AssociatedSymptoms, "ear pain");
        let json = serde_json::to_value(&flag).unwrap();
        assert_eq!(json["tag"], "ASSOCIATED_SYMPTOMS");
        assert_eq!(json["keyword"], "ear pain");
    }

    #[test]
    fn push_unique_ignores_case() {
        let mut flags = vec![Flag::new(FlagTag::Symptom, "Sore Throat")];
        assert!(!push_unique(&mut flags, Flag::new(FlagTag::Severity, "sore throat")));
        assert!(push_unique(&mut flags, Flag::new(FlagTag::Severity, "mild")));
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0].tag, FlagTag::Symptom);
    }

    #[test]
    fn patient_history_defaults_missing_lists() {
        let history: PatientHistory =
            serde_json::from_str(r#"{"medicalHistory": ["Asthma", "Type 2 Diabetes"]}"#).unwrap();
        assert_eq!(history.medical_history.len(), 2);
        assert!(history.allergies.is_empty());
        assert!(history.previous_visits.is_empty());
        assert_eq!(history.medical_history_text(), "asthma type 2 diabetes");
    }

    #[test]
    fn empty_history_object_is_all_empty() {
        let history: PatientHistory = serde_json::from_str("{}").unwrap();
        assert!(history.is_empty());
        assert_eq!(history, PatientHistory::default());
    }

    #[test]
    fn triage_record_uses_backend_field_names() {
        let record = TriageRecord {
            patient_id: "p-1".into(),
            transcript: "t".into(),
            summary: "s".into(),
            urgency: Urgency::SemiUrgent,
            confidence: 0.7,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["patientID"], "p-1");
        assert_eq!(json["AISummary"], "s");
        assert_eq!(json["AIUrgency"], "semi-urgent");
        assert!(json.get("AIConfidence").is_some());
    }
}
