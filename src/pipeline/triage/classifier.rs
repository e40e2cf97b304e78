//! Statistical urgency classifier collaborator.
//!
//! The classifier itself runs as a separate service; this module extracts
//! the tabular features it was trained on and talks to it over HTTP. Every
//! failure degrades to `(routine, 0.0)` so the live path never stops here.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::{MlPrediction, Urgency};
use super::TriageError;

static DAYS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*days?").expect("Invalid days regex"));

static WEEKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*weeks?").expect("Invalid weeks regex"));

static PAIN_SCALE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:out of|/)\s*10").expect("Invalid pain scale regex"));

static AGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3})\s*(?:year|yr|yo|old)").expect("Invalid age regex"));

const DEFAULT_DURATION_DAYS: u32 = 2;
const DEFAULT_PAIN_SEVERITY: u32 = 3;
const DEFAULT_AGE: u32 = 40;

static SYMPTOM_CATEGORIES: &[(&str, &[&str])] = &[
    ("throat_pain", &["sore throat", "throat pain", "throat hurt"]),
    ("congestion", &["congestion", "stuffy", "blocked"]),
    ("cough", &["cough", "coughing"]),
    ("hoarseness", &["hoarse", "voice change"]),
    ("post_nasal", &["post nasal", "drip"]),
    ("ear_pain", &["ear pain", "earache"]),
];

/// Feature row sent to the classifier service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptFeatures {
    pub duration_days: u32,
    pub pain_severity: u32,
    pub age: u32,
    pub nasal_discharge: String,
    pub language: String,
    pub worsening: u8,
    pub fever: u8,
    pub dizziness: u8,
    pub hearing_change: u8,
    pub immunocompromised: u8,
    pub symptom_keywords: String,
}

fn any_of(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

fn capture_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl TranscriptFeatures {
    pub fn extract(transcript: &str) -> Self {
        let text = transcript.to_lowercase();

        Self {
            duration_days: Self::duration_days(&text),
            pain_severity: Self::pain_severity(&text),
            age: capture_number(&AGE_RE, &text).unwrap_or(DEFAULT_AGE),
            nasal_discharge: Self::nasal_discharge(&text).to_string(),
            language: "english".to_string(),
            worsening: any_of(&text, &["worse", "worsening", "getting worse"]).into(),
            fever: text.contains("fever").into(),
            dizziness: any_of(&text, &["dizziness", "dizzy", "vertigo"]).into(),
            hearing_change: any_of(&text, &["hearing", "deaf", "muffled"]).into(),
            immunocompromised: any_of(
                &text,
                &["immunocompromised", "immune", "suppressed", "immunosuppressed"],
            )
            .into(),
            symptom_keywords: Self::symptom_keywords(&text),
        }
    }

    fn duration_days(text: &str) -> u32 {
        if let Some(days) = capture_number(&DAYS_RE, text) {
            return days;
        }
        capture_number(&WEEKS_RE, text)
            .map(|w| w.saturating_mul(7))
            .unwrap_or(DEFAULT_DURATION_DAYS)
    }

    fn pain_severity(text: &str) -> u32 {
        if let Some(score) = capture_number(&PAIN_SCALE_RE, text) {
            return score;
        }
        if any_of(text, &["severe", "unbearable", "excruciating"]) {
            8
        } else if any_of(text, &["moderate", "significant"]) {
            5
        } else {
            DEFAULT_PAIN_SEVERITY
        }
    }

    fn nasal_discharge(text: &str) -> &'static str {
        if text.contains("clear") {
            "clear"
        } else if any_of(text, &["yellow", "greenish", "purulent"]) {
            "yellow"
        } else if any_of(text, &["blood", "bloody"]) {
            "bloody"
        } else {
            "clear"
        }
    }

    fn symptom_keywords(text: &str) -> String {
        let found: Vec<&str> = SYMPTOM_CATEGORIES
            .iter()
            .filter(|(_, terms)| any_of(text, terms))
            .map(|(name, _)| *name)
            .collect();
        if found.is_empty() {
            "general_ent_concern".to_string()
        } else {
            found.join(";")
        }
    }
}

// ── Classifier seam ─────────────────────────────────────────

/// Predicts urgency from a transcript. Infallible by contract.
pub trait UrgencyClassifier: Send + Sync {
    fn predict(&self, transcript: &str) -> MlPrediction;
}

/// Classifier service reached over HTTP at `{base_url}/predict`.
pub struct RemoteClassifier {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct PredictResponse {
    urgency: String,
    confidence: f32,
}

impl RemoteClassifier {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, TriageError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TriageError::HttpClient(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn try_predict(&self, features: &TranscriptFeatures) -> Result<MlPrediction, TriageError> {
        let url = format!("{}/predict", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(features)
            .send()
            .map_err(|e| TriageError::HttpClient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TriageError::ClassifierError(status.as_u16()));
        }

        let parsed: PredictResponse = response
            .json()
            .map_err(|e| TriageError::ResponseParsing(e.to_string()))?;

        Ok(MlPrediction {
            urgency: Urgency::from_label_or_routine(&parsed.urgency),
            confidence: parsed.confidence,
        })
    }
}

impl UrgencyClassifier for RemoteClassifier {
    fn predict(&self, transcript: &str) -> MlPrediction {
        let features = TranscriptFeatures::extract(transcript);
        match self.try_predict(&features) {
            Ok(prediction) => {
                tracing::debug!(
                    urgency = %prediction.urgency,
                    confidence = prediction.confidence,
                    "Classifier prediction received"
                );
                prediction
            }
            Err(e) => {
                tracing::warn!(error = %e, "Classifier unavailable, using fallback prediction");
                MlPrediction::unavailable()
            }
        }
    }
}

/// Used when no classifier service is configured.
pub struct UnavailableClassifier;

impl UrgencyClassifier for UnavailableClassifier {
    fn predict(&self, _transcript: &str) -> MlPrediction {
        MlPrediction::unavailable()
    }
}

/// Always returns the same prediction. For tests.
pub struct FixedClassifier(pub MlPrediction);

impl UrgencyClassifier for FixedClassifier {
    fn predict(&self, _transcript: &str) -> MlPrediction {
        self.0
    }
}
