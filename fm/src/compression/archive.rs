//! Generic archive backend: wraps a single file in a deflated ZIP

use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use super::{BackendId, CompressionBackend, CompressionError};

/// Writes `<name>.zip` next to the input, refusing to replace an existing file
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipBackend;

impl ZipBackend {
    /// `photo.jpg` -> `photo.jpg.zip`
    pub fn archive_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".zip");
        path.with_file_name(name)
    }

    /// Create `target` exclusively and fill it; a partial archive is removed
    /// on failure, an existing file at `target` is never touched
    fn write_archive(source: &Path, target: &Path) -> io::Result<()> {
        let entry_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;

        let mut input = File::open(source)?;
        let output = OpenOptions::new().write(true).create_new(true).open(target)?;

        let written = Self::fill(&mut input, output, entry_name);
        if written.is_err()
            && let Err(cleanup) = fs::remove_file(target)
        {
            warn!(?target, error = %cleanup, "ZipBackend::write_archive: failed to remove partial archive");
        }
        written
    }

    fn fill(input: &mut File, output: File, entry_name: String) -> io::Result<()> {
        let mut writer = ZipWriter::new(output);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        writer.start_file(entry_name, options).map_err(io::Error::other)?;
        io::copy(input, &mut writer)?;
        writer.finish().map_err(io::Error::other)?;
        Ok(())
    }
}

#[async_trait]
impl CompressionBackend for ZipBackend {
    fn id(&self) -> BackendId {
        BackendId::GenericArchive
    }

    async fn compress(&self, path: &Path) -> Result<PathBuf, CompressionError> {
        debug!(?path, "ZipBackend::compress: called");
        let source = path.to_path_buf();
        let target = Self::archive_path(path);

        let (src, dst) = (source.clone(), target.clone());
        let result = tokio::task::spawn_blocking(move || Self::write_archive(&src, &dst))
            .await
            .map_err(|e| CompressionError::Backend {
                backend: BackendId::GenericArchive,
                message: format!("archive task failed: {}", e),
            })?;

        if let Err(e) = result {
            return Err(CompressionError::Io {
                backend: BackendId::GenericArchive,
                path: source,
                source: e,
            });
        }

        debug!(?target, "ZipBackend::compress: archive written");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_archive_path() {
        assert_eq!(
            ZipBackend::archive_path(Path::new("/tmp/a/report.pdf")),
            PathBuf::from("/tmp/a/report.pdf.zip")
        );
    }

    #[tokio::test]
    async fn test_compress_writes_readable_archive() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "hello hello hello hello").unwrap();

        let out = ZipBackend.compress(&file).await.unwrap();
        assert_eq!(out, dir.path().join("notes.txt.zip"));
        assert!(file.exists(), "backend must not remove its input");

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_name("notes.txt").unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello hello hello hello");
    }

    #[tokio::test]
    async fn test_compress_missing_file_leaves_no_archive() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("missing.bin");

        let err = ZipBackend.compress(&file).await.unwrap_err();
        assert!(matches!(err, CompressionError::Io { .. }));
        assert!(!dir.path().join("missing.bin.zip").exists());
    }

    #[tokio::test]
    async fn test_existing_archive_name_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        let existing = dir.path().join("notes.txt.zip");
        std::fs::write(&file, "notes").unwrap();
        std::fs::write(&existing, "USER DATA").unwrap();

        let err = ZipBackend.compress(&file).await.unwrap_err();
        match err {
            CompressionError::Io { source, .. } => assert_eq!(source.kind(), io::ErrorKind::AlreadyExists),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "USER DATA");
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "notes");
    }
}
