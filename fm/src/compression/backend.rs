//! Backend identifiers, the backend capability and the backend registry

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::{ConvertApiBackend, CompressionError, TinyPngBackend, ZipBackend};
use crate::config::CompressionConfig;

/// Backend selector values accepted in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BackendId {
    #[serde(rename = "specialized-image", alias = "tinypng")]
    SpecializedImage,
    #[serde(rename = "specialized-document", alias = "convertapi")]
    SpecializedDocument,
    #[serde(rename = "generic-archive", alias = "zip")]
    GenericArchive,
}

impl BackendId {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::SpecializedImage => "specialized-image",
            BackendId::SpecializedDocument => "specialized-document",
            BackendId::GenericArchive => "generic-archive",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can compress a single file
///
/// A backend writes its output to a fresh file next to the input and never
/// modifies or removes the input itself.
#[async_trait]
pub trait CompressionBackend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Compress `path`, returning the path of the newly written output
    async fn compress(&self, path: &Path) -> Result<PathBuf, CompressionError>;
}

/// Create an empty, uniquely named `<stem>_compressed.<random>.<ext>` next to `path`
///
/// The name is created exclusively, so an existing file (for example a
/// user's own `photo_compressed.jpg`) is never reused or truncated. The
/// extension of `path` is kept; a path without one gets none.
pub fn reserve_sibling(path: &Path) -> io::Result<PathBuf> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let (prefix, suffix) = match path.extension() {
        Some(ext) => (format!("{}_compressed.", stem), format!(".{}", ext.to_string_lossy())),
        None => (format!("{}_compressed_", stem), String::new()),
    };

    let file = tempfile::Builder::new().prefix(&prefix).suffix(&suffix).tempfile_in(dir)?;
    let (_, reserved) = file.keep().map_err(|e| e.error)?;
    Ok(reserved)
}

/// Write backend output bytes to a freshly reserved sibling of `path`
pub(crate) async fn write_sibling(id: BackendId, path: &Path, bytes: &[u8]) -> Result<PathBuf, CompressionError> {
    let io_err = |source| CompressionError::Io {
        backend: id,
        path: path.to_path_buf(),
        source,
    };
    let target = reserve_sibling(path).map_err(io_err)?;
    if let Err(e) = tokio::fs::write(&target, bytes).await {
        let _ = tokio::fs::remove_file(&target).await;
        return Err(io_err(e));
    }
    Ok(target)
}

/// One backend per identifier
#[derive(Clone, Default)]
pub struct BackendSet {
    backends: HashMap<BackendId, Arc<dyn CompressionBackend>>,
}

impl BackendSet {
    /// Empty set (tests add their own backends)
    pub fn new() -> Self {
        Self::default()
    }

    /// The three standard backends configured from `compression`
    pub fn from_config(config: &CompressionConfig) -> Result<Self, CompressionError> {
        debug!("BackendSet::from_config: called");
        Ok(Self::new()
            .with_backend(Arc::new(ZipBackend))
            .with_backend(Arc::new(TinyPngBackend::from_config(&config.tinypng)?))
            .with_backend(Arc::new(ConvertApiBackend::from_config(&config.convertapi)?)))
    }

    /// Add or replace the backend for its identifier
    pub fn with_backend(mut self, backend: Arc<dyn CompressionBackend>) -> Self {
        self.backends.insert(backend.id(), backend);
        self
    }

    pub fn get(&self, id: BackendId) -> Option<Arc<dyn CompressionBackend>> {
        self.backends.get(&id).cloned()
    }
}

impl fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&BackendId> = self.backends.keys().collect();
        ids.sort();
        f.debug_struct("BackendSet").field("backends", &ids).finish()
    }
}
