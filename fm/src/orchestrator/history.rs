//! Execution history: the append-only record of a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::OperationKind;
use crate::oracle::ProposedCall;
use crate::ops::ExecutionError;

/// Status of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Error recorded for a failed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    pub code: String,
    pub message: String,
}

/// One attempted operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub index: usize,
    pub operation: String,
    pub arguments: Value,
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionStep {
    /// A step about to run
    pub fn pending(index: usize, call: &ProposedCall) -> Self {
        Self {
            index,
            operation: call.operation_name.clone(),
            arguments: call.arguments.clone(),
            status: StepStatus::Pending,
            result: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn succeed(mut self, result: Value) -> Self {
        self.status = StepStatus::Succeeded;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn fail(mut self, error: &ExecutionError) -> Self {
        self.status = StepStatus::Failed;
        self.error = Some(StepError {
            code: error.code().to_string(),
            message: error.to_string(),
        });
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Succeeded
    }
}

/// Ordered steps of one run; steps can be added but never removed or reordered
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExecutionHistory {
    steps: Vec<ExecutionStep>,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished step
    pub fn record(&mut self, step: ExecutionStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[ExecutionStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&ExecutionStep> {
        self.steps.last()
    }

    pub fn succeeded_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.succeeded()).count()
    }

    /// Files that reached the output tree: successful move steps
    pub fn processed_files(&self) -> usize {
        let name = OperationKind::Move.name();
        self.steps.iter().filter(|s| s.succeeded() && s.operation == name).count()
    }

    pub fn into_steps(self) -> Vec<ExecutionStep> {
        self.steps
    }
}
