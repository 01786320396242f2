//! scan: list the regular files of a directory

use std::path::Path;
use tracing::{debug, info};

use super::{ExecutionError, FileRecord, OpsContext};

/// Regular, non-hidden files directly inside `input_dir`, sorted by name
pub async fn scan(ctx: &OpsContext, input_dir: &Path) -> Result<Vec<FileRecord>, ExecutionError> {
    debug!(?input_dir, "scan: called");
    let dir = ctx.check_input(input_dir)?;
    let scan_err = |source| ExecutionError::ScanError {
        path: dir.clone(),
        source,
    };

    let mut entries = tokio::fs::read_dir(&dir).await.map_err(scan_err)?;
    let mut records = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
        if entry.file_name().to_string_lossy().starts_with('.') {
            debug!(name = ?entry.file_name(), "scan: skipping hidden entry");
            continue;
        }
        let file_type = entry.file_type().await.map_err(scan_err)?;
        if !file_type.is_file() {
            continue;
        }
        records.push(FileRecord::unclassified(entry.path()));
    }

    records.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    info!(count = records.len(), ?dir, "scan: found files");
    Ok(records)
}
