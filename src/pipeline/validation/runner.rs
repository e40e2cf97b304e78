use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::dataset::EvalRecord;
use super::metrics::validate_summary;
use super::report::{SampleResult, ValidationReport};
use super::DatasetError;

/// Patient id sent with every evaluation request.
const EVAL_PATIENT_ID: &str = "eval";
const API_TIMEOUT_SECS: u64 = 30;

/// Where the summary under evaluation comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummarySource {
    /// The record's `reference_summary`.
    Reference,
    /// A live triage service at `url`.
    Api { url: String },
}

#[derive(Deserialize)]
struct TriageSummary {
    #[serde(default)]
    summary: String,
}

/// Fetches summaries from a running triage service.
struct ApiSummarizer {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl ApiSummarizer {
    fn new(base_url: &str) -> Result<Self, DatasetError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()
            .map_err(|e| DatasetError::Http(e.to_string()))?;
        Ok(Self {
            endpoint: format!("{}/ai/triage", base_url.trim_end_matches('/')),
            client,
        })
    }

    fn fetch(&self, transcript: &str) -> Result<String, reqwest::Error> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "patient_id": EVAL_PATIENT_ID, "transcript": transcript }))
            .send()?
            .error_for_status()?;
        Ok(response.json::<TriageSummary>()?.summary)
    }

    /// Summary for a transcript; failures become an inline error marker.
    fn summarize(&self, transcript: &str) -> String {
        match self.fetch(transcript) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, "Triage API call failed during validation");
                format!("[API error: {e}]")
            }
        }
    }
}

/// Score every record and aggregate the results.
pub fn run_validation(
    records: &[EvalRecord],
    source: &SummarySource,
) -> Result<ValidationReport, DatasetError> {
    let api = match source {
        SummarySource::Reference => None,
        SummarySource::Api { url } => Some(ApiSummarizer::new(url)?),
    };

    let results = records
        .iter()
        .map(|record| {
            let summary = match &api {
                Some(api) => api.summarize(&record.transcript),
                None => record.reference_summary.clone(),
            };
            let scores = validate_summary(&record.transcript, &summary);
            SampleResult {
                transcript: record.transcript.clone(),
                summary,
                urgency: record.urgency,
                note: record.note.clone(),
                scores,
            }
        })
        .collect();

    let report = ValidationReport::from_results(results);
    tracing::info!(
        samples = report.samples,
        correctness = report.mean_correctness,
        faithfulness = report.mean_faithfulness,
        relevance = report.mean_relevance,
        "Validation run complete"
    );
    Ok(report)
}
