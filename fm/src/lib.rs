//! agentfm - planner-driven file organizer
//!
//! A planning oracle (normally an LLM) picks file operations from a fixed
//! catalog one at a time; the orchestrator validates and executes each one
//! and feeds the growing history back to the planner.
//!
//! - [`catalog`]: operation signatures and argument validation
//! - [`compression`]: backend selection and the compression backends
//! - [`ops`]: scan, classify, create_folder, move and compress primitives
//! - [`oracle`]: planner contract, LLM-backed and scripted planners
//! - [`orchestrator`]: the planning/execution loop and run reports

pub mod catalog;
pub mod cli;
pub mod compression;
pub mod config;
pub mod llm;
pub mod oracle;
pub mod ops;
pub mod orchestrator;
pub mod prompts;

pub use catalog::{Catalog, Operation, OperationKind, OperationSpec, ValidationError};
pub use config::Config;
pub use oracle::{PlanDecision, PlanningError, PlanningOracle, ProposedCall, ScriptedOracle};
pub use ops::{ExecutionError, OpsContext, OpsExecutor};
pub use orchestrator::{AbortReason, Orchestrator, OrchestratorConfig, RunOutcome, RunReport};
