//! Planning oracle
//!
//! The oracle looks at the goal, the operation catalog and the history so
//! far, and answers with the next call, `Done` or `Abort`.

mod error;
mod llm;
mod scripted;

pub use error::PlanningError;
pub use llm::{LlmOracle, decode_reply};
pub use scripted::ScriptedOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::Catalog;
use crate::orchestrator::ExecutionHistory;

/// A call the planner wants made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedCall {
    #[serde(alias = "operation")]
    pub operation_name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ProposedCall {
    pub fn new(operation_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            operation_name: operation_name.into(),
            arguments,
        }
    }
}

/// What the planner decided
#[derive(Debug, Clone, PartialEq)]
pub enum PlanDecision {
    Propose(ProposedCall),
    Done,
    Abort { reason: String },
}

/// Something that decides the next step of a run
#[async_trait]
pub trait PlanningOracle: Send + Sync {
    async fn next_step(
        &self,
        goal: &str,
        catalog: &Catalog,
        history: &ExecutionHistory,
    ) -> Result<PlanDecision, PlanningError>;
}
