//! Planning oracle error types

use std::time::Duration;
use thiserror::Error;

use crate::llm::LlmError;

/// Errors from asking the planner for the next step
#[derive(Debug, Error)]
pub enum PlanningError {
    /// The planner could not be reached; `transient` failures are worth asking again
    #[error("Planner unavailable: {message}")]
    OracleUnavailable {
        message: String,
        retry_after: Option<Duration>,
        transient: bool,
    },

    /// A reply arrived but does not describe a usable step
    #[error("Malformed plan: {0}")]
    MalformedPlan(String),
}

impl PlanningError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        PlanningError::OracleUnavailable {
            message: message.into(),
            retry_after: None,
            transient: true,
        }
    }

    /// Unreachable for a reason that asking again cannot fix (missing key, rejected request)
    pub fn unreachable(message: impl Into<String>) -> Self {
        PlanningError::OracleUnavailable {
            message: message.into(),
            retry_after: None,
            transient: false,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        PlanningError::MalformedPlan(message.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, PlanningError::OracleUnavailable { transient: true, .. })
    }

    /// Service-suggested delay before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PlanningError::OracleUnavailable { retry_after, .. } => *retry_after,
            PlanningError::MalformedPlan(_) => None,
        }
    }
}

impl From<LlmError> for PlanningError {
    fn from(err: LlmError) -> Self {
        if err.is_undecodable() {
            return PlanningError::MalformedPlan(err.to_string());
        }
        PlanningError::OracleUnavailable {
            retry_after: err.retry_after(),
            transient: err.is_transient(),
            message: err.to_string(),
        }
    }
}
