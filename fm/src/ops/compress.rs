//! compress: selected backend with a single ZIP fallback

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{ExecutionError, OpsContext};
use crate::compression::{BackendId, CompressionError};

/// Result of a successful compress step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressOutcome {
    pub source: PathBuf,
    pub compressed_path: PathBuf,
    pub backend: BackendId,
    pub used_fallback: bool,
}

/// Compress `path` with the backend selected for `file_type`
///
/// Only files already under the output root are compressed. On failure the
/// fallback backend is tried exactly once (unless it was the one that just
/// failed). The original file survives any failure.
pub async fn compress(ctx: &OpsContext, path: &Path, file_type: &str) -> Result<CompressOutcome, ExecutionError> {
    debug!(?path, %file_type, "compress: called");
    let path = ctx.check_output(path)?;
    if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
        return Err(ExecutionError::CompressionFailed {
            path,
            reason: "not a regular file".to_string(),
        });
    }

    let primary = ctx.selector().resolve(file_type);
    let first_err = match attempt(ctx, primary, &path).await {
        Ok(compressed_path) => {
            return Ok(CompressOutcome {
                source: path,
                compressed_path,
                backend: primary,
                used_fallback: false,
            });
        }
        Err(e) => e,
    };

    let fallback = ctx.selector().fallback();
    if primary == fallback {
        warn!(?path, error = %first_err, "compress: fallback backend failed");
        return Err(ExecutionError::CompressionFailed {
            path,
            reason: first_err.to_string(),
        });
    }

    warn!(?path, error = %first_err, %fallback, "compress: retrying with fallback");
    match attempt(ctx, fallback, &path).await {
        Ok(compressed_path) => Ok(CompressOutcome {
            source: path,
            compressed_path,
            backend: fallback,
            used_fallback: true,
        }),
        Err(second_err) => {
            warn!(?path, error = %second_err, "compress: fallback failed too");
            Err(ExecutionError::CompressionFailed {
                path,
                reason: format!("{}; then {}", first_err, second_err),
            })
        }
    }
}

async fn attempt(ctx: &OpsContext, id: BackendId, path: &Path) -> Result<PathBuf, CompressionError> {
    let backend = ctx.backends().get(id).ok_or(CompressionError::Unavailable(id))?;
    let output = backend.compress(path).await?;
    let compressed = settle(id, path, output).await?;
    info!(?compressed, backend = %id, "compress: done");
    Ok(compressed)
}

/// Put the backend output in its final place
///
/// Output with the original's extension replaces the original; any other
/// output (an archive) stays beside it and the original is removed.
async fn settle(id: BackendId, original: &Path, output: PathBuf) -> Result<PathBuf, CompressionError> {
    if output == original {
        return Ok(output);
    }

    if output.extension() == original.extension() {
        if let Err(source) = tokio::fs::rename(&output, original).await {
            let _ = tokio::fs::remove_file(&output).await;
            return Err(CompressionError::Io {
                backend: id,
                path: original.to_path_buf(),
                source,
            });
        }
        return Ok(original.to_path_buf());
    }

    if let Err(e) = tokio::fs::remove_file(original).await {
        warn!(?original, error = %e, "compress: could not remove original after archiving");
    }
    Ok(output)
}
