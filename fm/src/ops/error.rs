//! File operation error types

use std::path::PathBuf;
use thiserror::Error;

/// Domain failures of a file operation
///
/// These are recorded into the execution history and never abort a run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Cannot scan {path}: {source}")]
    ScanError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot create folder {path}: {reason}")]
    FolderCreateError { path: PathBuf, reason: String },

    #[error("Destination already holds {destination}")]
    MoveConflict { destination: PathBuf },

    #[error("Cannot move {from} to {to}: {error}")]
    MoveError {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Compression of {path} failed: {reason}")]
    CompressionFailed { path: PathBuf, reason: String },

    #[error("Path {path} is outside {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

impl ExecutionError {
    /// Stable identifier recorded in the history
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionError::ScanError { .. } => "scan_error",
            ExecutionError::FolderCreateError { .. } => "folder_create_error",
            ExecutionError::MoveConflict { .. } => "move_conflict",
            ExecutionError::MoveError { .. } => "move_error",
            ExecutionError::CompressionFailed { .. } => "compression_failed",
            ExecutionError::OutsideRoot { .. } => "outside_root",
        }
    }
}
