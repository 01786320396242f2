//! Operation catalog
//!
//! Registry of the operations the planner may invoke. `describe()` is the
//! exact list sent to the planner, in registration order so that requests are
//! reproducible across runs. `validate()` is the only way to turn a proposed
//! call into an executable [`Operation`].

mod error;
mod operation;
mod spec;

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

pub use error::{CatalogError, ValidationError};
pub use operation::{Operation, OperationKind};
pub use spec::{OperationSpec, ParamSpec, ParamType};

use crate::llm::ToolDefinition;

/// Registry of invocable operations
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<OperationSpec>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the five file primitives
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for kind in OperationKind::ALL {
            let registered = catalog.register(kind.spec());
            debug_assert!(registered.is_ok(), "duplicate standard operation {}", kind.name());
        }
        catalog
    }

    /// Add an operation; names are unique
    pub fn register(&mut self, spec: OperationSpec) -> Result<(), CatalogError> {
        debug!(name = %spec.name, "Catalog::register: called");
        if self.index.contains_key(&spec.name) {
            return Err(CatalogError::DuplicateOperation { name: spec.name });
        }
        self.index.insert(spec.name.clone(), self.entries.len());
        self.entries.push(spec);
        Ok(())
    }

    /// Find an operation by name
    pub fn lookup(&self, name: &str) -> Result<&OperationSpec, ValidationError> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| ValidationError::UnknownOperation { name: name.to_string() })
    }

    /// All operations in registration order
    pub fn describe(&self) -> &[OperationSpec] {
        &self.entries
    }

    /// Operations as tool definitions, in registration order
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.entries.iter().map(OperationSpec::to_tool_definition).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check a proposed call against the catalog and produce the typed operation
    ///
    /// Fails with `UnknownOperation` when the name is not registered or has no
    /// file primitive behind it, and with `BadArguments` when the arguments do
    /// not satisfy the declared parameters.
    pub fn validate(&self, name: &str, arguments: &Value) -> Result<Operation, ValidationError> {
        debug!(%name, "Catalog::validate: called");
        let spec = self.lookup(name)?;
        spec.check_arguments(arguments)?;

        let kind = OperationKind::from_name(name).ok_or_else(|| {
            debug!(%name, "Catalog::validate: registered but no primitive implements it");
            ValidationError::UnknownOperation { name: name.to_string() }
        })?;
        Operation::from_arguments(kind, arguments)
    }
}
