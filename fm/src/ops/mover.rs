//! move: relocate a file into a destination folder without overwriting

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{ExecutionError, OpsContext};

/// Move `source` into `destination_folder`, keeping its file name
///
/// Fails with `MoveConflict` when the destination already holds a file of
/// the same name; the source is left in place in that case.
pub async fn move_file(ctx: &OpsContext, source: &Path, destination_folder: &Path) -> Result<PathBuf, ExecutionError> {
    debug!(?source, ?destination_folder, "move_file: called");
    let source = ctx.check_input(source)?;
    let folder = ctx.check_output(destination_folder)?;

    let move_err = |to: &Path, error: io::Error| ExecutionError::MoveError {
        from: source.clone(),
        to: to.to_path_buf(),
        error,
    };

    let meta = tokio::fs::metadata(&source).await.map_err(|e| move_err(&folder, e))?;
    if !meta.is_file() {
        return Err(move_err(
            &folder,
            io::Error::new(io::ErrorKind::InvalidInput, "source is not a regular file"),
        ));
    }
    match tokio::fs::metadata(&folder).await {
        Ok(m) if m.is_dir() => {}
        Ok(_) => {
            return Err(move_err(
                &folder,
                io::Error::new(io::ErrorKind::NotADirectory, "destination is not a folder"),
            ));
        }
        Err(e) => return Err(move_err(&folder, e)),
    }

    let Some(name) = source.file_name() else {
        return Err(move_err(
            &folder,
            io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
        ));
    };
    let target = folder.join(name);
    if tokio::fs::symlink_metadata(&target).await.is_ok() {
        warn!(?target, "move_file: destination occupied");
        return Err(ExecutionError::MoveConflict { destination: target });
    }

    let (from, to) = (source.clone(), target.clone());
    let result = tokio::task::spawn_blocking(move || relocate(&from, &to))
        .await
        .map_err(|e| move_err(&target, io::Error::other(e)))?;

    match result {
        Ok(()) => {
            info!(?source, ?target, "move_file: moved");
            Ok(target)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(ExecutionError::MoveConflict { destination: target })
        }
        Err(e) => Err(move_err(&target, e)),
    }
}

/// Link the target then unlink the source; copy then remove when linking is
/// not possible. Both paths fail with `AlreadyExists` on an occupied target.
fn relocate(from: &Path, to: &Path) -> io::Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => {}
        Err(e) if matches!(e.kind(), io::ErrorKind::CrossesDevices | io::ErrorKind::Unsupported) => {
            debug!(?from, ?to, kind = ?e.kind(), "relocate: cannot link, copying");
            return copy_then_remove(from, to);
        }
        Err(e) => return Err(e),
    }

    if let Err(e) = fs::remove_file(from) {
        if let Err(undo) = fs::remove_file(to) {
            warn!(?to, error = %undo, "relocate: failed to drop link after source removal failed");
        }
        return Err(e);
    }
    Ok(())
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let mut input = File::open(from)?;
    let mut output = OpenOptions::new().write(true).create_new(true).open(to)?;

    let copied = io::copy(&mut input, &mut output).and_then(|_| output.sync_all());
    if let Err(e) = copied {
        drop(output);
        let _ = fs::remove_file(to);
        return Err(e);
    }

    fs::remove_file(from)
}
