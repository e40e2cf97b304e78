pub mod metrics;
pub mod dataset;
pub mod report;
pub mod runner;
pub mod synthetic;

pub use metrics::*;
pub use dataset::*;
pub use report::*;
pub use runner::*;
pub use synthetic::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}:{line}: malformed evaluation record: {source}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Failed to serialize evaluation record: {0}")]
    Serialize(serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(String),
}
