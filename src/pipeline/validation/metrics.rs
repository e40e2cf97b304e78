//! Rule-based summary quality metrics.
//!
//! Three independent scorers compare a generated summary with its source
//! transcript: correctness (no contradicted facts), faithfulness (token
//! grounding) and relevance (ENT vocabulary coverage). All are pure and
//! deterministic; none calls a model.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Vocabulary counted by the relevance scorer (substring match).
pub static ENT_TERMS: &[&str] = &[
    "sore throat", "throat", "pharyngitis", "congestion", "nasal", "sinus",
    "ear", "earache", "otalgia", "hearing", "hoarse", "voice", "cough",
    "swallow", "dysphagia", "stridor", "wheezing", "breathing", "pain",
    "fever", "discharge", "pressure", "dizziness", "vertigo", "symptom",
    "duration", "days", "weeks", "improving", "worsening", "severe", "mild",
    "moderate", "red flag", "urgent", "routine", "findings", "patient",
];

/// Distinct ENT terms needed for full relevance credit.
const RELEVANCE_TARGET_TERMS: f64 = 8.0;
const RELEVANCE_TERM_WEIGHT: f64 = 0.85;
const RELEVANCE_LENGTH_BONUS: f64 = 0.15;
const RELEVANCE_MIN_TOKENS: usize = 10;
const RELEVANCE_MAX_TOKENS: usize = 150;

const CONTRADICTION_PENALTY: f64 = 0.5;
const MISSING_FACT_PENALTY: f64 = 0.1;

const FAITHFULNESS_BOOST_THRESHOLD: f64 = 0.3;
const FAITHFULNESS_BOOST: f64 = 1.1;

static NEGATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(no|not|without|denies|none)\s+(fever|pain|discharge|breathing difficulty|dysphagia)\b",
    )
    .expect("Invalid negation regex")
});

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+)\s*(day|days|week|weeks|hour|hours)\b").expect("Invalid duration regex")
});

static SEVERITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(mild|moderate|severe|improving|worsening|stable)\b")
        .expect("Invalid severity regex")
});

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9']+").expect("Invalid token regex"));

// ── Result types ────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectnessDetails {
    /// Negated transcript terms checked against the summary.
    pub negation_checks: usize,
    pub contradictions: usize,
    /// Duration and severity categories present in the transcript.
    pub fact_checks: usize,
    /// Of those, categories reflected in the summary.
    pub passed: usize,
    pub score_raw: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaithfulnessDetails {
    pub overlap_ratio: f64,
    pub summary_tokens: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevanceDetails {
    pub ent_terms_found: usize,
    pub total_tokens: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationDetails {
    pub correctness: CorrectnessDetails,
    pub faithfulness: FaithfulnessDetails,
    pub relevance: RelevanceDetails,
}

/// Scores for one (transcript, summary) pair, each in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationScores {
    pub correctness: f64,
    pub faithfulness: f64,
    pub relevance: f64,
    pub details: ValidationDetails,
}

// ── Text helpers ────────────────────────────────────────────

/// Lower-case and collapse whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Distinct `[a-z0-9']+` tokens of the normalized text.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let normalized = normalize(text);
    TOKEN_RE
        .find_iter(&normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Facts extracted from a transcript for the correctness check.
#[derive(Debug, Default, PartialEq)]
struct KeyFacts {
    /// (amount, unit) pairs, e.g. ("3", "days").
    durations: BTreeSet<(String, String)>,
    severity_terms: BTreeSet<String>,
    /// (negator, term) pairs, e.g. ("no", "fever").
    negations: BTreeSet<(String, String)>,
}

fn extract_key_facts(normalized: &str) -> KeyFacts {
    KeyFacts {
        durations: DURATION_RE
            .captures_iter(normalized)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect(),
        severity_terms: SEVERITY_RE
            .captures_iter(normalized)
            .map(|c| c[1].to_string())
            .collect(),
        negations: NEGATION_RE
            .captures_iter(normalized)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect(),
    }
}

/// True when `term` appears word-bounded in `summary` and is never
/// introduced there by a negator.
fn asserts_term(summary: &str, term: &str) -> bool {
    let escaped = regex::escape(term);
    let present = Regex::new(&format!(r"\b{escaped}\b"))
        .map(|re| re.is_match(summary))
        .unwrap_or(false);
    if !present {
        return false;
    }
    let negated = Regex::new(&format!(r"\b(no|not|without|denies|none)\s+{escaped}\b"))
        .map(|re| re.is_match(summary))
        .unwrap_or(false);
    !negated
}

// ── Scorers ─────────────────────────────────────────────────

/// Factual consistency of the summary with the transcript.
pub fn score_correctness(transcript: &str, summary: &str) -> (f64, CorrectnessDetails) {
    let facts = extract_key_facts(&normalize(transcript));
    let s = normalize(summary);
    let mut details = CorrectnessDetails::default();

    for (_, term) in &facts.negations {
        details.negation_checks += 1;
        if asserts_term(&s, term) {
            details.contradictions += 1;
        }
    }

    if !facts.durations.is_empty() {
        details.fact_checks += 1;
        if facts
            .durations
            .iter()
            .any(|(amount, unit)| s.contains(amount.as_str()) && s.contains(unit.as_str()))
        {
            details.passed += 1;
        }
    }

    if !facts.severity_terms.is_empty() {
        details.fact_checks += 1;
        if facts.severity_terms.iter().any(|term| s.contains(term.as_str())) {
            details.passed += 1;
        }
    }

    let score = if details.negation_checks + details.fact_checks == 0 {
        1.0
    } else {
        1.0 - details.contradictions as f64 * CONTRADICTION_PENALTY
            - (details.fact_checks - details.passed) as f64 * MISSING_FACT_PENALTY
    };
    details.score_raw = score;
    (score.clamp(0.0, 1.0), details)
}

/// Share of summary tokens grounded in the transcript.
pub fn score_faithfulness(transcript: &str, summary: &str) -> (f64, FaithfulnessDetails) {
    let summary_tokens = tokenize(summary);
    if summary_tokens.is_empty() {
        return (
            1.0,
            FaithfulnessDetails {
                overlap_ratio: 1.0,
                summary_tokens: 0,
            },
        );
    }

    let transcript_tokens = tokenize(transcript);
    let shared = summary_tokens.intersection(&transcript_tokens).count();
    let ratio = shared as f64 / summary_tokens.len() as f64;
    let score = if ratio > FAITHFULNESS_BOOST_THRESHOLD {
        (ratio * FAITHFULNESS_BOOST).min(1.0)
    } else {
        ratio
    };

    (
        score,
        FaithfulnessDetails {
            overlap_ratio: round3(ratio),
            summary_tokens: summary_tokens.len(),
        },
    )
}

/// ENT topicality of the summary, independent of the transcript.
pub fn score_relevance(summary: &str) -> (f64, RelevanceDetails) {
    let tokens = tokenize(summary);
    if tokens.is_empty() {
        return (0.0, RelevanceDetails::default());
    }

    let s = normalize(summary);
    let found = ENT_TERMS.iter().filter(|term| s.contains(*term)).count();
    let term_ratio = (found as f64 / RELEVANCE_TARGET_TERMS).min(1.0);
    let length_ok = (RELEVANCE_MIN_TOKENS..=RELEVANCE_MAX_TOKENS).contains(&tokens.len());
    let score = term_ratio * RELEVANCE_TERM_WEIGHT + if length_ok { RELEVANCE_LENGTH_BONUS } else { 0.0 };

    (
        score.min(1.0),
        RelevanceDetails {
            ent_terms_found: found,
            total_tokens: tokens.len(),
        },
    )
}

/// Run all three scorers; scores are rounded to three decimals.
pub fn validate_summary(transcript: &str, summary: &str) -> ValidationScores {
    let (correctness, correctness_details) = score_correctness(transcript, summary);
    let (faithfulness, faithfulness_details) = score_faithfulness(transcript, summary);
    let (relevance, relevance_details) = score_relevance(summary);

    ValidationScores {
        correctness: round3(correctness),
        faithfulness: round3(faithfulness),
        relevance: round3(relevance),
        details: ValidationDetails {
            correctness: correctness_details,
            faithfulness: faithfulness_details,
            relevance: relevance_details,
        },
    }
}
