//! create_folder: idempotent type folder creation

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ExecutionError, FileType, OpsContext};

/// Ensure `<output_dir>/<type folder>` exists and return it
pub async fn create_folder(ctx: &OpsContext, output_dir: &Path, type_name: &str) -> Result<PathBuf, ExecutionError> {
    debug!(?output_dir, %type_name, "create_folder: called");
    let folder = FileType::parse(type_name);
    let target = ctx.check_output(&output_dir.join(folder.folder_name()))?;
    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_dir() => {
            debug!(?target, "create_folder: already exists");
            return Ok(target);
        }
        Ok(_) => {
            return Err(ExecutionError::FolderCreateError {
                path: target,
                reason: "a file already occupies this path".to_string(),
            });
        }
        Err(_) => {}
    }

    if let Err(e) = tokio::fs::create_dir_all(&target).await {
        return Err(ExecutionError::FolderCreateError {
            path: target,
            reason: e.to_string(),
        });
    }
    info!(?target, "create_folder: created");
    Ok(target)
}
