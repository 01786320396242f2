//! Catalog and validation error types

use thiserror::Error;

/// Errors raised while building the catalog
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Operation '{name}' is already registered")]
    DuplicateOperation { name: String },
}

/// Errors raised when a proposed call does not match the catalog
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown operation: {name}")]
    UnknownOperation { name: String },

    #[error("Bad arguments for '{operation}': {reason}")]
    BadArguments { operation: String, reason: String },
}

impl ValidationError {
    pub(crate) fn bad(operation: &str, reason: impl Into<String>) -> Self {
        ValidationError::BadArguments {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}
