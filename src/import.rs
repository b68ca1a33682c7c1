//! Import of externally prepared form contents.
//!
//! A JSON object with any subset of the form's camelCase fields becomes a
//! `TaskFormPatch`, merged into the form the same way a draft restore is.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::form::TaskFormPatch;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not a task form: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse JSON text into a form patch.
pub fn parse_patch(json: &str) -> Result<TaskFormPatch, serde_json::Error> {
    serde_json::from_str(json)
}

/// Read a JSON file into a form patch.
pub fn import_patch(path: &Path) -> Result<TaskFormPatch, ImportError> {
    let content = fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_patch(&content).map_err(|source| ImportError::Parse {
        path: path.display().to_string(),
        source,
    })
}
