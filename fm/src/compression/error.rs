//! Compression error types

use std::path::PathBuf;
use thiserror::Error;

use super::BackendId;

/// Errors a compression backend can report
#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("{backend}: credential not set (export {env})")]
    MissingCredential { backend: BackendId, env: String },

    #[error("{backend}: cannot read or write {path}: {source}")]
    Io {
        backend: BackendId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{backend}: service error {status}: {message}")]
    Service {
        backend: BackendId,
        status: u16,
        message: String,
    },

    #[error("{backend}: request failed: {source}")]
    Transport {
        backend: BackendId,
        #[source]
        source: reqwest::Error,
    },

    #[error("{backend}: {message}")]
    Backend { backend: BackendId, message: String },

    #[error("no backend registered for {0}")]
    Unavailable(BackendId),
}

impl CompressionError {
    /// Which backend produced the error
    pub fn backend(&self) -> BackendId {
        match self {
            CompressionError::MissingCredential { backend, .. }
            | CompressionError::Io { backend, .. }
            | CompressionError::Service { backend, .. }
            | CompressionError::Transport { backend, .. }
            | CompressionError::Backend { backend, .. } => *backend,
            CompressionError::Unavailable(backend) => *backend,
        }
    }
}
