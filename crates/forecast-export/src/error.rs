//! Error types for the export crate.
//!
//! Only run-level failures are errors. Per-variable and per-timestep problems
//! surface as `None` from the extraction and derivation functions instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an export run (or a single batch write).
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Missing grid coordinates: {0}")]
    MissingCoordinates(String),

    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize archive: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
