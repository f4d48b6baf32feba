//! Error types for pulse-core operations.
//!
//! Library functions return these as values. The hook binary is the only place
//! that turns them into "log and exit successfully".

use std::path::PathBuf;

/// All errors that can occur in pulse-core operations.
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Settings file malformed: {path}: {details}")]
    SettingsMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using PulseError.
pub type Result<T> = std::result::Result<T, PulseError>;
