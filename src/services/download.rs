//! Save-as-file service for completed results

use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Receives the bytes of a completed result under a default file name
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Save `bytes` as `file_name`, returning a human-readable location
    async fn save(&self, file_name: &str, media_type: &str, bytes: &[u8]) -> Result<String>;
}

/// Writes downloads into a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsDownloadSink {
    dir: PathBuf,
}

impl FsDownloadSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for FsDownloadSink {
    async fn save(&self, file_name: &str, media_type: &str, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| WorkflowError::file_io_error("create download directory", &self.dir, &e))?;

        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| WorkflowError::file_io_error("write download", &path, &e))?;

        info!(
            path = %path.display(),
            media_type = %media_type,
            size_bytes = bytes.len(),
            "Saved processed image"
        );
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fs_sink_writes_file() {
        let temp = TempDir::new().unwrap();
        let sink = FsDownloadSink::new(temp.path().join("downloads"));

        let location = sink
            .save("processed-image.png", "image/png", b"P1")
            .await
            .unwrap();

        let expected = temp.path().join("downloads").join("processed-image.png");
        assert_eq!(location, expected.display().to_string());
        assert_eq!(std::fs::read(expected).unwrap(), b"P1");
    }

    #[tokio::test]
    async fn test_fs_sink_overwrites_previous_download() {
        let temp = TempDir::new().unwrap();
        let sink = FsDownloadSink::new(temp.path());

        sink.save("out.png", "image/png", b"first").await.unwrap();
        sink.save("out.png", "image/png", b"second").await.unwrap();
        assert_eq!(std::fs::read(temp.path().join("out.png")).unwrap(), b"second");
    }
}
