//! Clinic backend collaborator: patient history lookup and triage case
//! persistence.
//!
//! The service token is owned by the client instance, fetched on first use
//! and re-acquired once when the backend answers 401.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::triage::{PatientHistory, TriageRecord};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Http(String),

    #[error("Backend returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Backend login failed (status {0})")]
    Login(u16),

    #[error("Malformed backend response: {0}")]
    ResponseParsing(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid patient id")]
    InvalidPatientId,

    #[error("Token cache lock poisoned")]
    LockPoisoned,
}

/// Persistence seam used by the triage engine.
pub trait TriageBackend: Send + Sync {
    /// History for a patient; empty when unknown or unreachable.
    fn patient_history(&self, patient_id: &str) -> PatientHistory;

    fn save_triage(&self, record: &TriageRecord) -> Result<(), BackendError>;
}

// ── HTTP client ─────────────────────────────────────────────

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

pub struct BackendClient {
    base_url: String,
    base: Url,
    username: String,
    password: String,
    client: Client,
    token: Mutex<Option<String>>,
}

impl BackendClient {
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        timeout_secs: u64,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;
        let base = Url::parse(base_url).map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            base,
            username: username.to_string(),
            password: password.to_string(),
            client,
            token: Mutex::new(None),
        })
    }

    fn login(&self) -> Result<String, BackendError> {
        let response = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&LoginRequest {
                email: &self.username,
                password: &self.password,
            })
            .send()
            .map_err(|e| BackendError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Login(response.status().as_u16()));
        }

        let parsed: LoginResponse = response
            .json()
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))?;

        tracing::info!("Backend service token acquired");
        Ok(parsed.access_token)
    }

    /// Cached token, logging in when the cache is empty.
    fn token(&self) -> Result<String, BackendError> {
        let mut cached = self.token.lock().map_err(|_| BackendError::LockPoisoned)?;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login()?;
        *cached = Some(token.clone());
        Ok(token)
    }

    fn clear_token(&self) -> Result<(), BackendError> {
        *self.token.lock().map_err(|_| BackendError::LockPoisoned)? = None;
        Ok(())
    }

    /// Send an authorized request, refreshing the token once on 401.
    fn send_authorized(
        &self,
        build: impl Fn(&Client) -> RequestBuilder,
    ) -> Result<Response, BackendError> {
        let send = || -> Result<Response, BackendError> {
            let token = self.token()?;
            build(&self.client)
                .bearer_auth(&token)
                .send()
                .map_err(|e| BackendError::Http(e.to_string()))
        };

        let response = send()?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response);
        }

        tracing::warn!("Backend rejected service token, re-authenticating");
        self.clear_token()?;
        check_status(send()?)
    }

    /// `{base}/patients/{id}` with the id as one percent-encoded segment.
    fn patient_url(&self, patient_id: &str) -> Result<Url, BackendError> {
        if matches!(patient_id, "" | "." | "..") {
            return Err(BackendError::InvalidPatientId);
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("patients")
            .push(patient_id);
        Ok(url)
    }

    fn fetch_history(&self, patient_id: &str) -> Result<PatientHistory, BackendError> {
        let url = self.patient_url(patient_id)?;
        let response = self.send_authorized(|c| c.get(url.clone()))?;
        response
            .json()
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))
    }
}

fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

impl TriageBackend for BackendClient {
    fn patient_history(&self, patient_id: &str) -> PatientHistory {
        match self.fetch_history(patient_id) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch patient history, continuing without it");
                PatientHistory::default()
            }
        }
    }

    fn save_triage(&self, record: &TriageRecord) -> Result<(), BackendError> {
        let url = format!("{}/triage-cases/", self.base_url);
        self.send_authorized(|c| c.post(&url).json(record))?;
        tracing::info!(urgency = %record.urgency, "Triage case saved to backend");
        Ok(())
    }
}

// ── In-memory backend ───────────────────────────────────────

/// Backend held in memory. Serves configured histories and records saves.
#[derive(Default)]
pub struct InMemoryBackend {
    histories: Mutex<Vec<(String, PatientHistory)>>,
    saved: Mutex<Vec<TriageRecord>>,
    fail_saves: bool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose saves always fail.
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn with_history(self, patient_id: &str, history: PatientHistory) -> Self {
        if let Ok(mut histories) = self.histories.lock() {
            histories.push((patient_id.to_string(), history));
        }
        self
    }

    /// Records saved so far, in order.
    pub fn saved(&self) -> Vec<TriageRecord> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl TriageBackend for InMemoryBackend {
    fn patient_history(&self, patient_id: &str) -> PatientHistory {
        self.histories
            .lock()
            .ok()
            .and_then(|h| {
                h.iter()
                    .find(|(id, _)| id == patient_id)
                    .map(|(_, history)| history.clone())
            })
            .unwrap_or_default()
    }

    fn save_triage(&self, record: &TriageRecord) -> Result<(), BackendError> {
        if self.fail_saves {
            return Err(BackendError::Status {
                status: 500,
                body: "save rejected".into(),
            });
        }
        self.saved
            .lock()
            .map_err(|_| BackendError::LockPoisoned)?
            .push(record.clone());
        Ok(())
    }
}
