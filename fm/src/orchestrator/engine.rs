//! Orchestrator - the Planning -> Validating -> Executing -> Recording loop

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    AbortReason, ExecutionHistory, ExecutionStep, LoopControlError, OrchestratorConfig, RunOutcome, RunReport,
};
use crate::catalog::{Catalog, Operation, ValidationError};
use crate::oracle::{PlanDecision, PlanningError, PlanningOracle, ProposedCall};
use crate::ops::OpsExecutor;

/// Loop state; `Finished` is terminal
#[derive(Debug)]
enum State {
    Planning,
    Validating(ProposedCall),
    Executing(ProposedCall, Operation),
    Recording(ExecutionStep),
    Finished(RunOutcome),
}

/// Drives one run at a time: asks the oracle, validates, executes, records
///
/// Exactly one oracle call or file operation is outstanding at any moment.
pub struct Orchestrator {
    catalog: Catalog,
    oracle: Arc<dyn PlanningOracle>,
    executor: OpsExecutor,
    config: OrchestratorConfig,
    stop: Option<watch::Receiver<bool>>,
}

impl Orchestrator {
    pub fn new(
        catalog: Catalog,
        oracle: Arc<dyn PlanningOracle>,
        executor: OpsExecutor,
        config: OrchestratorConfig,
    ) -> Self {
        debug!(max_iterations = config.max_iterations, "Orchestrator::new: called");
        Self {
            catalog,
            oracle,
            executor,
            config,
            stop: None,
        }
    }

    /// Stop before the next planning call once the signal reads `true`
    pub fn with_stop_signal(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn stop_requested(&self) -> bool {
        self.stop.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Run until the oracle is done, the run aborts, or the step cap is hit
    pub async fn run(&self, goal: &str) -> RunReport {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        info!(%run_id, %goal, max_iterations = self.config.max_iterations, "Orchestrator::run: starting");

        let mut history = ExecutionHistory::new();
        let mut state = State::Planning;
        let outcome = loop {
            state = match state {
                State::Planning => self.plan(goal, &history).await,
                State::Validating(call) => self.validate(call),
                State::Executing(call, operation) => self.execute(&history, call, operation).await,
                State::Recording(step) => {
                    debug!(index = step.index, status = ?step.status, "Orchestrator::run: recording step");
                    history.record(step);
                    State::Planning
                }
                State::Finished(outcome) => break outcome,
            };
        };

        match &outcome {
            RunOutcome::Completed { processed_files } => {
                info!(%run_id, processed_files, steps = history.len(), "Orchestrator::run: completed");
            }
            RunOutcome::Aborted { reason } => {
                warn!(%run_id, code = reason.code(), %reason, steps = history.len(), "Orchestrator::run: aborted");
            }
        }
        RunReport::new(run_id, goal, outcome, history, started_at)
    }

    async fn plan(&self, goal: &str, history: &ExecutionHistory) -> State {
        if self.stop_requested() {
            info!("Orchestrator::plan: stop requested");
            return State::Finished(aborted(AbortReason::Cancelled));
        }

        match self.ask_oracle(goal, history).await {
            Ok(PlanDecision::Done) => State::Finished(RunOutcome::Completed {
                processed_files: history.processed_files(),
            }),
            Ok(PlanDecision::Abort { reason }) => State::Finished(aborted(AbortReason::PlannerAborted { message: reason })),
            Ok(PlanDecision::Propose(call)) => {
                if history.len() >= self.config.max_iterations {
                    let err = LoopControlError::IterationLimitExceeded {
                        limit: self.config.max_iterations,
                    };
                    warn!(error = %err, operation = %call.operation_name, "Orchestrator::plan: refusing step");
                    return State::Finished(aborted(err.into()));
                }
                debug!(operation = %call.operation_name, "Orchestrator::plan: proposed");
                State::Validating(call)
            }
            Err((PlanningError::MalformedPlan(message), _)) => {
                State::Finished(aborted(AbortReason::InvalidPlan { message }))
            }
            Err((PlanningError::OracleUnavailable { message, .. }, attempts)) => {
                State::Finished(aborted(AbortReason::OracleUnreachable { attempts, message }))
            }
        }
    }

    /// Call the oracle, retrying transient unavailability with capped exponential backoff
    async fn ask_oracle(&self, goal: &str, history: &ExecutionHistory) -> Result<PlanDecision, (PlanningError, u32)> {
        let attempts = self.config.oracle_retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            match self.oracle.next_step(goal, &self.catalog, history).await {
                Ok(decision) => return Ok(decision),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = e
                        .retry_after()
                        .unwrap_or_else(|| self.config.backoff(attempt))
                        .min(Duration::from_millis(self.config.backoff_max_ms));
                    warn!(error = %e, attempt, ?delay, "Orchestrator::ask_oracle: retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }

    fn validate(&self, call: ProposedCall) -> State {
        match self.catalog.validate(&call.operation_name, &call.arguments) {
            Ok(operation) => State::Executing(call, operation),
            Err(ValidationError::UnknownOperation { name }) => {
                State::Finished(aborted(AbortReason::UnknownOperation { operation: name }))
            }
            Err(ValidationError::BadArguments { operation, reason }) => {
                State::Finished(aborted(AbortReason::BadArguments {
                    operation,
                    message: reason,
                }))
            }
        }
    }

    async fn execute(&self, history: &ExecutionHistory, call: ProposedCall, operation: Operation) -> State {
        let step = ExecutionStep::pending(history.len(), &call);
        debug!(index = step.index, kind = %operation.kind(), "Orchestrator::execute: called");
        let step = match self.executor.execute(&operation).await {
            Ok(result) => step.succeed(result),
            Err(e) => {
                warn!(index = step.index, code = e.code(), error = %e, "Orchestrator::execute: step failed");
                step.fail(&e)
            }
        };
        State::Recording(step)
    }
}

fn aborted(reason: AbortReason) -> RunOutcome {
    RunOutcome::Aborted { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{BackendSet, CompressionSelector, ZipBackend};
    use crate::oracle::ScriptedOracle;
    use crate::ops::OpsContext;
    use crate::orchestrator::StepStatus;
    use serde_json::json;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn executor(base: &Path) -> (OpsExecutor, PathBuf, PathBuf) {
        let input = base.join("in");
        let output = base.join("out");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();
        let ctx = OpsContext::new(
            input.clone(),
            output.clone(),
            &["PDF".to_string(), "JPG".to_string()],
            CompressionSelector::default(),
            BackendSet::new().with_backend(Arc::new(ZipBackend)),
        );
        (OpsExecutor::new(ctx), input, output)
    }

    fn fast_config(max_iterations: usize) -> OrchestratorConfig {
        OrchestratorConfig {
            max_iterations,
            oracle_retries: 2,
            backoff_initial_ms: 1,
            backoff_max_ms: 2,
        }
    }

    fn propose(name: &str, arguments: serde_json::Value) -> PlanDecision {
        PlanDecision::Propose(ProposedCall::new(name, arguments))
    }

    fn orchestrator(base: &Path, oracle: ScriptedOracle, max_iterations: usize) -> (Orchestrator, PathBuf, PathBuf) {
        let (executor, input, output) = executor(base);
        let orch = Orchestrator::new(Catalog::standard(), Arc::new(oracle), executor, fast_config(max_iterations));
        (orch, input, output)
    }

    #[tokio::test]
    async fn test_scan_then_done_completes() {
        let temp = tempdir().unwrap();
        let input = temp.path().join("in");
        let oracle = ScriptedOracle::new(vec![propose("scan", json!({"input_dir": input})), PlanDecision::Done]);
        let (orch, _, _) = orchestrator(temp.path(), oracle, 10);

        let report = orch.run("sort").await;
        assert_eq!(report.outcome, RunOutcome::Completed { processed_files: 0 });
        assert_eq!(report.history.len(), 1);
        assert_eq!(report.history[0].status, StepStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_failed_step_is_recorded_and_loop_continues() {
        let temp = tempdir().unwrap();
        let input = temp.path().join("in");
        let output = temp.path().join("out");
        let oracle = ScriptedOracle::new(vec![
            propose(
                "move",
                json!({"source": input.join("missing.pdf"), "destination_folder": output.join("PDF")}),
            ),
            PlanDecision::Done,
        ]);
        let (orch, _, _) = orchestrator(temp.path(), oracle, 10);

        let report = orch.run("sort").await;
        assert!(report.outcome.is_completed());
        assert_eq!(report.history[0].status, StepStatus::Failed);
        assert_eq!(report.history[0].error.as_ref().unwrap().code, "move_error");
        assert_eq!(report.succeeded_steps(), 0);
    }

    #[tokio::test]
    async fn test_unknown_operation_aborts_without_executing() {
        let temp = tempdir().unwrap();
        let oracle = ScriptedOracle::new(vec![propose("delete", json!({"path": "/in/a"}))]);
        let (orch, _, _) = orchestrator(temp.path(), oracle, 10);

        let report = orch.run("sort").await;
        assert_eq!(report.abort_reason().unwrap().code(), "unknown_operation");
        assert!(report.history.is_empty());
    }

    #[tokio::test]
    async fn test_bad_arguments_abort() {
        let temp = tempdir().unwrap();
        let oracle = ScriptedOracle::new(vec![propose("create_folder", json!({"output_dir": "/out"}))]);
        let (orch, _, _) = orchestrator(temp.path(), oracle, 10);

        let report = orch.run("sort").await;
        assert_eq!(report.abort_reason().unwrap().code(), "bad_arguments");
        assert!(report.history.is_empty());
    }

    #[tokio::test]
    async fn test_repeating_planner_hits_iteration_limit() {
        let temp = tempdir().unwrap();
        let input = temp.path().join("in");
        let scan = propose("scan", json!({"input_dir": input.join("missing")}));
        let oracle = ScriptedOracle::new(vec![scan; 10]);
        let (orch, _, _) = orchestrator(temp.path(), oracle, 3);

        let report = orch.run("sort").await;
        assert_eq!(
            report.abort_reason(),
            Some(&AbortReason::IterationLimitExceeded { limit: 3 })
        );
        assert_eq!(report.history.len(), 3);
        assert!(report.history.iter().all(|s| s.status == StepStatus::Failed));
    }

    #[tokio::test]
    async fn test_oracle_unavailable_retries_then_aborts() {
        let temp = tempdir().unwrap();
        let oracle = ScriptedOracle::with_results(vec![
            Err(PlanningError::unavailable("down")),
            Err(PlanningError::unavailable("down")),
            Err(PlanningError::unavailable("down")),
            Ok(PlanDecision::Done),
        ]);
        let (orch, _, _) = orchestrator(temp.path(), oracle, 10);

        let report = orch.run("sort").await;
        match report.abort_reason() {
            Some(AbortReason::OracleUnreachable { attempts, .. }) => assert_eq!(*attempts, 3),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_permanent_unavailability_aborts_without_retry() {
        let temp = tempdir().unwrap();
        let oracle = Arc::new(ScriptedOracle::with_results(vec![
            Err(PlanningError::unreachable("API key is empty")),
            Ok(PlanDecision::Done),
        ]));
        let (executor, _, _) = executor(temp.path());
        let orch = Orchestrator::new(Catalog::standard(), oracle.clone(), executor, fast_config(10));

        let report = orch.run("sort").await;
        match report.abort_reason() {
            Some(AbortReason::OracleUnreachable { attempts, message }) => {
                assert_eq!(*attempts, 1);
                assert!(message.contains("API key is empty"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(oracle.remaining(), 1);
    }

    #[tokio::test]
    async fn test_oracle_recovers_within_retry_budget() {
        let temp = tempdir().unwrap();
        let oracle = ScriptedOracle::with_results(vec![
            Err(PlanningError::unavailable("blip")),
            Ok(PlanDecision::Done),
        ]);
        let (orch, _, _) = orchestrator(temp.path(), oracle, 10);

        assert!(orch.run("sort").await.outcome.is_completed());
    }

    #[tokio::test]
    async fn test_malformed_plan_is_not_retried() {
        let temp = tempdir().unwrap();
        let oracle = Arc::new(ScriptedOracle::with_results(vec![
            Err(PlanningError::malformed("prose")),
            Ok(PlanDecision::Done),
        ]));
        let (executor, _, _) = executor(temp.path());
        let orch = Orchestrator::new(Catalog::standard(), oracle.clone(), executor, fast_config(10));

        let report = orch.run("sort").await;
        assert_eq!(report.abort_reason().unwrap().code(), "invalid_plan");
        assert_eq!(oracle.remaining(), 1);
    }

    #[tokio::test]
    async fn test_planner_abort() {
        let temp = tempdir().unwrap();
        let oracle = ScriptedOracle::new(vec![PlanDecision::Abort {
            reason: "input folder is empty".to_string(),
        }]);
        let (orch, _, _) = orchestrator(temp.path(), oracle, 10);

        let report = orch.run("sort").await;
        assert_eq!(
            report.abort_reason(),
            Some(&AbortReason::PlannerAborted {
                message: "input folder is empty".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_stop_signal_prevents_planning() {
        let temp = tempdir().unwrap();
        let oracle = Arc::new(ScriptedOracle::new(vec![PlanDecision::Done]));
        let (executor, _, _) = executor(temp.path());
        let (tx, rx) = watch::channel(false);
        let orch =
            Orchestrator::new(Catalog::standard(), oracle.clone(), executor, fast_config(10)).with_stop_signal(rx);

        tx.send(true).unwrap();
        let report = orch.run("sort").await;
        assert_eq!(report.abort_reason(), Some(&AbortReason::Cancelled));
        assert_eq!(oracle.remaining(), 1);
    }

    #[tokio::test]
    async fn test_processed_files_counts_moves() {
        let temp = tempdir().unwrap();
        let (executor, input, output) = executor(temp.path());
        fs::write(input.join("a.pdf"), "pdf").unwrap();
        let oracle = ScriptedOracle::new(vec![
            propose("create_folder", json!({"output_dir": output, "type_name": "PDF"})),
            propose(
                "move",
                json!({"source": input.join("a.pdf"), "destination_folder": output.join("PDF")}),
            ),
            PlanDecision::Done,
        ]);
        let orch = Orchestrator::new(Catalog::standard(), Arc::new(oracle), executor, fast_config(10));

        let report = orch.run("sort").await;
        assert_eq!(report.outcome, RunOutcome::Completed { processed_files: 1 });
        assert!(output.join("PDF").join("a.pdf").exists());
    }
}
