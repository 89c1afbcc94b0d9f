//! CLI error type

use crate::export::ExportError;
use crate::import::ImportError;
use crate::storage::StorageError;
use std::path::PathBuf;

/// Error reported by a CLI command
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),
    #[error("Failed to write {0}: {1}")]
    FileWriteError(PathBuf, String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Import error: {0}")]
    ImportError(#[from] ImportError),
    #[error("Export error: {0}")]
    ExportError(#[from] ExportError),
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}
