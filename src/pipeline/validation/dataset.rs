use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::DatasetError;
use crate::pipeline::triage::Urgency;

/// One line of an evaluation JSONL file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalRecord {
    pub transcript: String,
    pub reference_summary: String,
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_urgency: Option<Urgency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Parse JSONL text. Blank lines are skipped; `path` is used for errors only.
pub fn parse_eval_records(text: &str, path: &Path) -> Result<Vec<EvalRecord>, DatasetError> {
    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Load an evaluation file. Any malformed line aborts the whole load.
pub fn load_eval_records(path: &Path) -> Result<Vec<EvalRecord>, DatasetError> {
    let text = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_eval_records(&text, path)?;
    tracing::info!(path = %path.display(), records = records.len(), "Evaluation set loaded");
    Ok(records)
}

/// Write records as JSONL, creating parent directories as needed.
pub fn write_eval_records(path: &Path, records: &[EvalRecord]) -> Result<PathBuf, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut file = fs::File::create(path).map_err(io_err)?;
    for record in records {
        let line = serde_json::to_string(record).map_err(DatasetError::Serialize)?;
        writeln!(file, "{line}").map_err(io_err)?;
    }
    Ok(path.to_path_buf())
}
