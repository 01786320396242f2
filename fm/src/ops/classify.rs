//! classify: extension lookup against the configured type set

use std::path::Path;
use tracing::debug;

use super::{ExecutionError, FileRecord, FileType, OpsContext};

/// Declared type for a file name; upper-cased extension if configured
pub fn declared_type(path: &Path, file_types: &[String]) -> FileType {
    let hidden = path
        .file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'));
    if hidden {
        return FileType::Unknown;
    }

    match path.extension().map(|e| e.to_string_lossy().to_ascii_uppercase()) {
        Some(ext) if file_types.iter().any(|t| t.eq_ignore_ascii_case(&ext)) => FileType::Known(ext),
        _ => FileType::Unknown,
    }
}

/// Record for `path` with declared type and destination folder filled in
///
/// No filesystem access beyond the root check.
pub fn classify(ctx: &OpsContext, path: &Path) -> Result<FileRecord, ExecutionError> {
    debug!(?path, "classify: called");
    let path = ctx.check_input(path)?;
    let declared = declared_type(&path, ctx.file_types());
    let destination = ctx.output_root().join(declared.folder_name());
    debug!(%declared, ?destination, "classify: returning");
    Ok(FileRecord {
        path,
        declared_type: Some(declared),
        destination_folder: Some(destination),
    })
}
