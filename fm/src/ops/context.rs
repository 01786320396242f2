//! OpsContext - roots, type set and backends shared by every file operation

use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::ExecutionError;
use crate::compression::{BackendSet, CompressionError, CompressionSelector};
use crate::config::Config;

/// Execution context for file operations within one run
///
/// Reads are confined to the input root (compress may also read the output
/// root) and writes to the output root.
#[derive(Debug, Clone)]
pub struct OpsContext {
    input_root: PathBuf,
    output_root: PathBuf,
    file_types: Vec<String>,
    selector: CompressionSelector,
    backends: BackendSet,
}

impl OpsContext {
    pub fn new(
        input_root: PathBuf,
        output_root: PathBuf,
        file_types: &[String],
        selector: CompressionSelector,
        backends: BackendSet,
    ) -> Self {
        debug!(?input_root, ?output_root, "OpsContext::new: called");
        Self {
            input_root,
            output_root,
            file_types: file_types.iter().map(|t| t.to_ascii_uppercase()).collect(),
            selector,
            backends,
        }
    }

    /// Context wired to the configured roots and the real backends
    pub fn from_config(config: &Config) -> Result<Self, CompressionError> {
        debug!("OpsContext::from_config: called");
        Ok(Self::new(
            config.paths.input.clone(),
            config.paths.output.clone(),
            &config.file_types,
            CompressionSelector::from_rules(&config.compression.rules),
            BackendSet::from_config(&config.compression)?,
        ))
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Configured type tags, upper-cased
    pub fn file_types(&self) -> &[String] {
        &self.file_types
    }

    pub fn selector(&self) -> &CompressionSelector {
        &self.selector
    }

    pub fn backends(&self) -> &BackendSet {
        &self.backends
    }

    /// Path must resolve under the input root
    pub fn check_input(&self, path: &Path) -> Result<PathBuf, ExecutionError> {
        Self::confine(path, &self.input_root)
    }

    /// Path must resolve under the output root
    pub fn check_output(&self, path: &Path) -> Result<PathBuf, ExecutionError> {
        Self::confine(path, &self.output_root)
    }

    fn confine(path: &Path, root: &Path) -> Result<PathBuf, ExecutionError> {
        debug!(?path, ?root, "OpsContext::confine: called");
        let outside = || ExecutionError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        };

        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            debug!("OpsContext::confine: parent components rejected");
            return Err(outside());
        }

        let normalized = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };

        // Existing paths are canonicalized to resolve symlinks; new paths
        // are checked through their parent.
        let resolved = if normalized.exists() {
            normalized.canonicalize().unwrap_or_else(|_| normalized.clone())
        } else {
            match (normalized.parent(), normalized.file_name()) {
                (Some(parent), Some(name)) if parent.exists() => parent
                    .canonicalize()
                    .map(|p| p.join(name))
                    .unwrap_or_else(|_| normalized.clone()),
                _ => normalized.clone(),
            }
        };

        let root_resolved = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        if resolved.starts_with(&root_resolved) {
            Ok(resolved)
        } else {
            debug!(?resolved, "OpsContext::confine: outside root");
            Err(outside())
        }
    }
}
