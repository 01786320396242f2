//! Compression strategy selection: file type tag -> backend

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::BackendId;

/// Pure mapping from file type to backend with a ZIP fallback
///
/// Never performs I/O; it only names the backend to invoke.
#[derive(Debug, Clone)]
pub struct CompressionSelector {
    rules: HashMap<String, BackendId>,
    fallback: BackendId,
}

impl Default for CompressionSelector {
    fn default() -> Self {
        Self {
            rules: HashMap::new(),
            fallback: BackendId::GenericArchive,
        }
    }
}

impl CompressionSelector {
    /// Build from configured rules; type tags are matched case-insensitively
    pub fn from_rules(rules: &BTreeMap<String, BackendId>) -> Self {
        Self {
            rules: rules.iter().map(|(k, v)| (k.to_ascii_uppercase(), *v)).collect(),
            fallback: BackendId::GenericArchive,
        }
    }

    /// Backend for `file_type`; unconfigured types get the fallback
    pub fn resolve(&self, file_type: &str) -> BackendId {
        let backend = self
            .rules
            .get(&file_type.to_ascii_uppercase())
            .copied()
            .unwrap_or(self.fallback);
        debug!(%file_type, %backend, "CompressionSelector::resolve");
        backend
    }

    /// The backend used when the selected one fails
    pub fn fallback(&self) -> BackendId {
        self.fallback
    }
}
