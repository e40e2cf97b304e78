use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::metrics::ValidationScores;
use crate::pipeline::triage::Urgency;

const RULE_WIDTH: usize = 60;
const EXCERPT_CHARS: usize = 120;

/// Scores for one evaluated pair, with enough context to inspect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    pub transcript: String,
    /// The summary that was actually scored.
    pub summary: String,
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub scores: ValidationScores,
}

/// Aggregate result of a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub samples: usize,
    pub mean_correctness: f64,
    pub mean_faithfulness: f64,
    pub mean_relevance: f64,
    pub results: Vec<SampleResult>,
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        values.sum::<f64>() / n as f64
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

impl ValidationReport {
    pub fn from_results(results: Vec<SampleResult>) -> Self {
        let n = results.len();
        Self {
            samples: n,
            mean_correctness: mean(results.iter().map(|r| r.scores.correctness), n),
            mean_faithfulness: mean(results.iter().map(|r| r.scores.faithfulness), n),
            mean_relevance: mean(results.iter().map(|r| r.scores.relevance), n),
            results,
        }
    }

    /// Plain-text report. `verbose` adds one block per sample.
    pub fn render_text(&self, verbose: bool) -> String {
        if self.results.is_empty() {
            return "No results.\n".to_string();
        }

        let rule = "=".repeat(RULE_WIDTH);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "SUMMARY VALIDATION REPORT");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "  Correctness  (avg): {:.3}", self.mean_correctness);
        let _ = writeln!(out, "  Faithfulness (avg): {:.3}", self.mean_faithfulness);
        let _ = writeln!(out, "  Relevance    (avg): {:.3}", self.mean_relevance);
        let _ = writeln!(out, "  N samples: {}", self.samples);
        let _ = writeln!(out, "{rule}");

        if verbose {
            for (i, sample) in self.results.iter().enumerate() {
                let _ = writeln!(out, "\n--- Sample {} ---", i + 1);
                let _ = writeln!(out, "  Transcript (excerpt): {}...", excerpt(&sample.transcript));
                let _ = writeln!(out, "  Summary (excerpt):   {}...", excerpt(&sample.summary));
                if let Some(note) = &sample.note {
                    let _ = writeln!(out, "  Note: {note}");
                }
                let _ = writeln!(
                    out,
                    "  Correctness: {:?}  Faithfulness: {:?}  Relevance: {:?}",
                    sample.scores.correctness, sample.scores.faithfulness, sample.scores.relevance
                );
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
