//! CLI-specific error types

use std::path::PathBuf;
use thiserror::Error;

use crate::staging::StagingError;
use crate::warehouse::WarehouseError;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to write file {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("IO error: {0}")]
    IoError(String),
}
