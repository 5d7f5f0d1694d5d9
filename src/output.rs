//! JSON persistence for stage results, reports and ground truth.
//!
//! **Layout** written by `write_outcome`:
//! ```text
//! {dir}/{document_id}.json
//! ```

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::evaluation::GroundTruth;
use crate::pipeline::DocumentOutcome;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json.as_bytes()).map_err(io_error(path))?;
    tracing::debug!(path = %path.display(), size = json.len(), "JSON written");
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, OutputError> {
    let raw = std::fs::read_to_string(path).map_err(io_error(path))?;
    serde_json::from_str(&raw).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Ground truth document: `{elements, text: [..], visual: [..]}`.
pub fn load_ground_truth(path: &Path) -> Result<GroundTruth, OutputError> {
    let truth: GroundTruth = read_json(path)?;
    tracing::info!(
        path = %path.display(),
        elements = truth.elements.len(),
        text = truth.text.len(),
        visual = truth.visual.len(),
        "Ground truth loaded"
    );
    Ok(truth)
}

/// Write one outcome under `dir`, named by its document id. Returns the file path.
pub fn write_outcome(dir: &Path, outcome: &DocumentOutcome) -> Result<PathBuf, OutputError> {
    let path = dir.join(format!("{}.json", outcome.document_id));
    write_json(&path, outcome)?;
    Ok(path)
}
