//! Orchestration loop
//!
//! [`Orchestrator::run`] alternates between the planning oracle and the file
//! operations until the oracle is done, the run aborts, or the step cap is
//! reached. Every run ends in a [`RunReport`].

mod config;
mod engine;
mod history;
mod report;

pub use config::OrchestratorConfig;
pub use engine::Orchestrator;
pub use history::{ExecutionHistory, ExecutionStep, StepError, StepStatus};
pub use report::{AbortReason, LoopControlError, RunOutcome, RunReport};
