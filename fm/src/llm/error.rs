//! Provider call failures

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limited by provider (retry after {retry_after:?})")]
    RateLimited { retry_after: Duration },

    #[error("provider returned HTTP {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unusable provider response: {0}")]
    InvalidResponse(String),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("cannot encode request or decode reply: {0}")]
    Json(#[from] serde_json::Error),

    #[error("client misconfigured: {0}")]
    Config(String),
}

impl LlmError {
    /// The same request may succeed later (throttling, 408, 5xx, network)
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Network(_) | LlmError::Timeout(_) => true,
            LlmError::ApiError { status, .. } => *status == 408 || *status >= 500,
            LlmError::InvalidResponse(_) | LlmError::Json(_) | LlmError::Config(_) => false,
        }
    }

    /// A reply arrived but could not be read
    pub fn is_undecodable(&self) -> bool {
        matches!(self, LlmError::InvalidResponse(_) | LlmError::Json(_))
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
