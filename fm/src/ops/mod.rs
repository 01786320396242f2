//! File operations library
//!
//! The five primitives the planner can call: [`scan`], [`classify`],
//! [`create_folder`], [`move_file`] and [`compress`]. Each takes an
//! explicit [`OpsContext`] and reports domain failures as
//! [`ExecutionError`].

mod classify;
mod compress;
mod context;
mod error;
mod executor;
mod folder;
mod mover;
mod record;
mod scan;

pub use classify::{classify, declared_type};
pub use compress::{CompressOutcome, compress};
pub use context::OpsContext;
pub use error::ExecutionError;
pub use executor::OpsExecutor;
pub use folder::create_folder;
pub use mover::move_file;
pub use record::{FileRecord, FileType, UNKNOWN_TYPE};
pub use scan::scan;
