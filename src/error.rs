//! Error type shared by the loader, checker, cleaner and exporter.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, checking, cleaning or exporting a dataset.
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("Path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Malformed {kind} record (id {id}): {reason}")]
    MalformedRecord {
        kind: &'static str,
        id: i64,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CleanError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        CleanError::NotFound { path: path.into() }
    }

    pub fn malformed(kind: &'static str, id: i64, reason: impl Into<String>) -> Self {
        CleanError::MalformedRecord {
            kind,
            id,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CleanError>;
