//! ScriptedOracle - replays a fixed list of decisions

use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use super::{PlanDecision, PlanningError, PlanningOracle, ProposedCall};
use crate::catalog::Catalog;
use crate::orchestrator::ExecutionHistory;

/// One entry of a plan file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PlanEntry {
    Call {
        #[serde(alias = "operation_name")]
        operation: String,
        #[serde(default)]
        arguments: Value,
    },
    Status {
        status: String,
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Plays back decisions in order; an exhausted script answers `Done`
///
/// Outcomes of earlier steps are ignored, so a failed step does not change
/// what comes next.
pub struct ScriptedOracle {
    decisions: Mutex<VecDeque<Result<PlanDecision, PlanningError>>>,
}

impl ScriptedOracle {
    pub fn new(decisions: Vec<PlanDecision>) -> Self {
        Self::with_results(decisions.into_iter().map(Ok).collect())
    }

    /// Script that can also fail, for exercising the loop's error paths
    pub fn with_results(results: Vec<Result<PlanDecision, PlanningError>>) -> Self {
        Self {
            decisions: Mutex::new(results.into()),
        }
    }

    /// Parse a YAML plan: a list of `{operation, arguments}` or `{status}` entries
    pub fn from_yaml(content: &str) -> Result<Self> {
        let entries: Vec<PlanEntry> = serde_yaml::from_str(content).context("Failed to parse plan")?;
        let decisions = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| match entry {
                PlanEntry::Call { operation, arguments } => Ok(PlanDecision::Propose(ProposedCall::new(operation, arguments))),
                PlanEntry::Status { status, reason } => match status.as_str() {
                    "done" => Ok(PlanDecision::Done),
                    "abort" => Ok(PlanDecision::Abort {
                        reason: reason.unwrap_or_else(|| "aborted by plan".to_string()),
                    }),
                    other => Err(eyre::eyre!("Plan entry {}: unknown status '{}'", i + 1, other)),
                },
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(decisions))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context(format!("Failed to read plan {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn remaining(&self) -> usize {
        self.decisions.lock().map(|d| d.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PlanningOracle for ScriptedOracle {
    async fn next_step(
        &self,
        _goal: &str,
        _catalog: &Catalog,
        history: &ExecutionHistory,
    ) -> Result<PlanDecision, PlanningError> {
        debug!(steps = history.len(), "ScriptedOracle::next_step: called");
        let mut decisions = self
            .decisions
            .lock()
            .map_err(|_| PlanningError::unavailable("script lock poisoned"))?;
        decisions.pop_front().unwrap_or(Ok(PlanDecision::Done))
    }
}
