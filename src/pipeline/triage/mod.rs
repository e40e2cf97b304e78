pub mod types;
pub mod dictionary;
pub mod parser;
pub mod flags;
pub mod escalation;
pub mod prompt;
pub mod ollama;
pub mod classifier;
pub mod orchestrator;

pub use types::*;
pub use parser::*;
pub use flags::*;
pub use escalation::*;
pub use prompt::*;
pub use ollama::*;
pub use classifier::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Classifier service returned status {0}")]
    ClassifierError(u16),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
