//! Triage API router.
//!
//! Routes:
//! - `POST /ai/triage`: live triage
//! - `GET /health`: liveness

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::config::AllowedOrigins;

/// Build the triage router with CORS applied.
pub fn triage_router(ctx: ApiContext, origins: &AllowedOrigins) -> Router {
    Router::new()
        .route("/ai/triage", post(endpoints::triage::classify))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx)
        .layer(cors_layer(origins))
}

fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match origins {
        AllowedOrigins::Any => layer.allow_origin(Any),
        AllowedOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin, "Ignoring unparsable CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(values))
        }
    }
}
