use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::pipeline::triage::TriageEngine;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiContext {
    pub engine: Arc<TriageEngine>,
    /// Fresh per process; lets callers detect a restart.
    pub instance_id: String,
    pub started_at: DateTime<Utc>,
}

impl ApiContext {
    pub fn new(engine: TriageEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            instance_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        }
    }
}
