//! File source adapters
//!
//! Explicit selection (a picked path), drag-and-drop (a list of dropped
//! files) and streamed input all produce the same [`FileCandidate`], which
//! then goes through the single `select_file` entry point. No validation
//! happens here.

use crate::error::{Result, WorkflowError};
use crate::types::FileCandidate;
use crate::utils::MediaTypeValidator;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Service for turning user deliveries into file candidates
pub struct FileSource;

impl FileSource {
    /// Read a picked file, declaring the media type a file picker would report
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<FileCandidate> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| WorkflowError::file_io_error("read selected file", path, &e))?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let media_type = MediaTypeValidator::guess_from_path(path);

        debug!(
            path = %path.display(),
            media_type = %media_type,
            size_bytes = bytes.len(),
            "Read selected file"
        );
        Ok(FileCandidate::new(name, media_type, bytes))
    }

    /// Read a streamed file (for example stdin) with an explicitly declared media type
    pub async fn from_reader<R: AsyncRead + Unpin>(
        mut reader: R,
        name: &str,
        media_type: &str,
    ) -> Result<FileCandidate> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        Ok(FileCandidate::new(name, media_type, buffer))
    }

    /// Resolve a drag-and-drop delivery to the first dropped file
    ///
    /// Returns `Ok(None)` for an empty drop, which the workflow reports as
    /// "no file selected".
    pub async fn from_drop(drop: &DroppedFiles) -> Result<Option<FileCandidate>> {
        match drop.first() {
            Some(path) => Self::from_path(path).await.map(Some),
            None => Ok(None),
        }
    }
}

/// Files delivered by a single drop gesture, in drop order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DroppedFiles {
    paths: Vec<PathBuf>,
}

impl DroppedFiles {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Only the first dropped file is used
    #[must_use]
    pub fn first(&self) -> Option<&Path> {
        self.paths.first().map(PathBuf::as_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
