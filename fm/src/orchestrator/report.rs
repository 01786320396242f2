//! Run outcome and report

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::{ExecutionHistory, ExecutionStep};

/// The loop ran out of its step budget
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopControlError {
    #[error("Iteration limit of {limit} steps exceeded")]
    IterationLimitExceeded { limit: usize },
}

/// Why a run stopped without completing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum AbortReason {
    OracleUnreachable { attempts: u32, message: String },
    InvalidPlan { message: String },
    UnknownOperation { operation: String },
    BadArguments { operation: String, message: String },
    IterationLimitExceeded { limit: usize },
    PlannerAborted { message: String },
    Cancelled,
}

impl AbortReason {
    /// Stable reason code
    pub fn code(&self) -> &'static str {
        match self {
            AbortReason::OracleUnreachable { .. } => "oracle_unreachable",
            AbortReason::InvalidPlan { .. } => "invalid_plan",
            AbortReason::UnknownOperation { .. } => "unknown_operation",
            AbortReason::BadArguments { .. } => "bad_arguments",
            AbortReason::IterationLimitExceeded { .. } => "iteration_limit_exceeded",
            AbortReason::PlannerAborted { .. } => "planner_aborted",
            AbortReason::Cancelled => "cancelled",
        }
    }
}

impl From<LoopControlError> for AbortReason {
    fn from(err: LoopControlError) -> Self {
        match err {
            LoopControlError::IterationLimitExceeded { limit } => AbortReason::IterationLimitExceeded { limit },
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::OracleUnreachable { attempts, message } => {
                write!(f, "planner unreachable after {} attempts: {}", attempts, message)
            }
            AbortReason::InvalidPlan { message } => write!(f, "planner reply was not a valid plan: {}", message),
            AbortReason::UnknownOperation { operation } => write!(f, "unknown operation '{}'", operation),
            AbortReason::BadArguments { operation, message } => {
                write!(f, "bad arguments for '{}': {}", operation, message)
            }
            AbortReason::IterationLimitExceeded { limit } => write!(f, "iteration limit of {} steps exceeded", limit),
            AbortReason::PlannerAborted { message } => write!(f, "planner gave up: {}", message),
            AbortReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed { processed_files: usize },
    Aborted { reason: AbortReason },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Everything a caller learns about a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub goal: String,
    pub outcome: RunOutcome,
    pub history: Vec<ExecutionStep>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub(crate) fn new(
        run_id: Uuid,
        goal: &str,
        outcome: RunOutcome,
        history: ExecutionHistory,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            goal: goal.to_string(),
            outcome,
            history: history.into_steps(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Steps that succeeded before the run ended
    pub fn succeeded_steps(&self) -> usize {
        self.history.iter().filter(|s| s.succeeded()).count()
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match &self.outcome {
            RunOutcome::Aborted { reason } => Some(reason),
            RunOutcome::Completed { .. } => None,
        }
    }

    /// Human-readable summary for the terminal
    pub fn summary(&self) -> String {
        let mut out = String::new();
        match &self.outcome {
            RunOutcome::Completed { processed_files } => {
                out.push_str(&format!("Completed: {} file(s) processed", processed_files));
            }
            RunOutcome::Aborted { reason } => {
                out.push_str(&format!("Aborted [{}]: {}", reason.code(), reason));
            }
        }
        out.push_str(&format!(
            "\n{} step(s), {} succeeded (run {})\n",
            self.history.len(),
            self.succeeded_steps(),
            self.run_id
        ));
        for step in &self.history {
            let detail = match &step.error {
                Some(err) => format!("failed: {}", err.message),
                None => "ok".to_string(),
            };
            out.push_str(&format!("  {:>3}. {} {} -> {}\n", step.index + 1, step.operation, step.arguments, detail));
        }
        out
    }
}
