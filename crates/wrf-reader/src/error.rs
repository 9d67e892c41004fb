//! Error types for grid source access.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for grid source operations.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Error types for reading gridded model output.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The dataset could not be opened
    #[error("failed to open dataset {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// Missing required variable
    #[error("variable not found: {0}")]
    MissingVariable(String),

    /// Requested hyperslab does not fit the variable shape
    #[error("invalid extents for {name}: {reason}")]
    InvalidExtents { name: String, reason: String },

    /// The underlying library failed while reading values
    #[error("failed to read {name}: {reason}")]
    ReadFailed { name: String, reason: String },
}

impl ReaderError {
    /// Create a ReadFailed error.
    pub fn read_failed(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ReadFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an InvalidExtents error.
    pub fn invalid_extents(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidExtents {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
