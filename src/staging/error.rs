//! Staging error types

use std::path::PathBuf;

/// Error type for staging ingestion
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// A required source file does not exist
    #[error("Staging file not found: {0}")]
    FileNotFound(PathBuf),

    /// A source file lacks a required header column
    #[error("{path}: missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    /// The CSV reader failed before any record could be read
    #[error("CSV error in {path}: {error}")]
    Csv { path: PathBuf, error: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StagingError {
    pub(crate) fn csv(path: &std::path::Path, error: csv::Error) -> Self {
        StagingError::Csv {
            path: path.to_path_buf(),
            error: error.to_string(),
        }
    }
}

/// Result type for staging operations
pub type StagingResult<T> = Result<T, StagingError>;
