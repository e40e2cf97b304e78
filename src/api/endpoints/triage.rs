//! Live triage endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::triage::{TriageRequest, TriageResponse};

/// Ids are opaque tokens; anything path-like is refused.
fn is_valid_patient_id(id: &str) -> bool {
    !matches!(id, "." | "..")
        && !id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_control())
}

/// `POST /ai/triage`: classify one call transcript.
///
/// The engine talks to its collaborators over blocking HTTP, so it runs
/// on the blocking pool.
pub async fn classify(
    State(ctx): State<ApiContext>,
    payload: Result<Json<TriageRequest>, JsonRejection>,
) -> Result<Json<TriageResponse>, ApiError> {
    let Json(request) = payload?;

    if request.patient_id.trim().is_empty() {
        return Err(ApiError::BadRequest("patient_id is required".into()));
    }
    if !is_valid_patient_id(&request.patient_id) {
        return Err(ApiError::BadRequest("patient_id contains invalid characters".into()));
    }
    if request.transcript.trim().is_empty() {
        return Err(ApiError::BadRequest("transcript is required".into()));
    }

    let engine = ctx.engine.clone();
    let response = tokio::task::spawn_blocking(move || engine.triage(&request)).await?;

    tracing::info!(
        urgency = %response.urgency,
        confidence = ?response.urgency_confidence,
        flags = response.flags.len(),
        "Triage response sent"
    );
    Ok(Json(response))
}
