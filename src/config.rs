use std::net::SocketAddr;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "ENT Triage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8100";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL_NAME: &str = "ent-triage";
pub const DEFAULT_OLLAMA_TIMEOUT_SECS: u64 = 120;
/// Timeout for the classifier and persistence collaborators.
pub const COLLABORATOR_TIMEOUT_SECS: u64 = 10;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,ent_triage_lib=debug,hyper=warn,reqwest=warn"
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid socket address '{value}'")]
    InvalidAddress { var: &'static str, value: String },

    #[error("{var}: expected a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var}: expected true or false, got '{value}'")]
    InvalidBool { var: &'static str, value: String },

    #[error("{0} is set but BACKEND_USERNAME/BACKEND_PASSWORD are missing")]
    MissingCredentials(&'static str),
}

/// Credentials and location of the persistence backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Which origins the HTTP surface accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }
}

/// Runtime configuration for the triage service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub ollama_base_url: String,
    pub model_name: String,
    pub ollama_timeout_secs: u64,
    /// `None` disables persistence.
    pub backend: Option<BackendConfig>,
    /// `None` means no classifier; predictions degrade to routine/0.0.
    pub ml_service_url: Option<String>,
    pub allowed_origins: AllowedOrigins,
    pub literal_red_match: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("TRIAGE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse()
            .map_err(|_| ConfigError::InvalidAddress {
                var: "TRIAGE_BIND_ADDR",
                value: bind_raw.clone(),
            })?;

        let ollama_timeout_secs = match get("OLLAMA_TIMEOUT_SECS") {
            None => DEFAULT_OLLAMA_TIMEOUT_SECS,
            Some(v) => match v.parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: "OLLAMA_TIMEOUT_SECS",
                        value: v,
                    })
                }
            },
        };

        let literal_red_match = match get("TRIAGE_LITERAL_RED_MATCH") {
            None => true,
            Some(v) => parse_bool(&v).ok_or(ConfigError::InvalidBool {
                var: "TRIAGE_LITERAL_RED_MATCH",
                value: v,
            })?,
        };

        let backend = match get("BACKEND_BASE_URL") {
            None => None,
            Some(base_url) => match (get("BACKEND_USERNAME"), get("BACKEND_PASSWORD")) {
                (Some(username), Some(password)) => Some(BackendConfig {
                    base_url,
                    username,
                    password,
                }),
                _ => return Err(ConfigError::MissingCredentials("BACKEND_BASE_URL")),
            },
        };

        Ok(Self {
            bind_addr,
            ollama_base_url: get("OLLAMA_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
            model_name: get("OLLAMA_MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            ollama_timeout_secs,
            backend,
            ml_service_url: get("ML_SERVICE_URL"),
            allowed_origins: AllowedOrigins::parse(&get("ALLOWED_ORIGINS").unwrap_or_default()),
            literal_red_match,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
