//! Liveness endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: &'static str,
    pub instance_id: String,
    pub started_at: String,
    pub uptime_secs: i64,
}

/// `GET /health`
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let uptime = chrono::Utc::now() - ctx.started_at;
    Json(HealthResponse {
        ok: true,
        version: crate::config::APP_VERSION,
        instance_id: ctx.instance_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        uptime_secs: uptime.num_seconds().max(0),
    })
}
