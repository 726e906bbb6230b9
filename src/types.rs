//! Core types for the image workflow

use crate::handles::BlobHandle;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A file-like object offered to the workflow
///
/// Carries the name and media type the file source declared, plus the raw
/// bytes. Nothing here is validated; `select_file` does that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    name: String,
    media_type: String,
    bytes: Arc<[u8]>,
}

impl FileCandidate {
    /// Create a candidate from its declared name, media type and contents
    pub fn new<N, M, B>(name: N, media_type: M, bytes: B) -> Self
    where
        N: Into<String>,
        M: Into<String>,
        B: Into<Vec<u8>>,
    {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: Arc::from(bytes),
        }
    }

    /// Replace the declared media type, keeping name and contents
    #[must_use]
    pub fn with_media_type<M: Into<String>>(mut self, media_type: M) -> Self {
        self.media_type = media_type.into();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Media type declared by the file source (may be empty)
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Identity of one accepted file selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SelectionId(pub(crate) u64);

impl SelectionId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SelectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sel-{}", self.0)
    }
}

/// Renderable preview of a source image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    /// `data:<media type>;base64,<payload>` URI
    pub data_uri: Arc<str>,
    /// Media type embedded in the URI
    pub media_type: String,
    /// Pixel dimensions, when the header could be read
    pub dimensions: Option<(u32, u32)>,
}

/// The user-selected image currently held by the workflow
#[derive(Debug, Clone)]
pub struct SourceImage {
    id: SelectionId,
    file: FileCandidate,
    selected_at: DateTime<Utc>,
    preview: Option<PreviewImage>,
}

impl SourceImage {
    pub(crate) fn new(id: SelectionId, file: FileCandidate) -> Self {
        Self {
            id,
            file,
            selected_at: Utc::now(),
            preview: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> SelectionId {
        self.id
    }

    #[must_use]
    pub fn file(&self) -> &FileCandidate {
        &self.file
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.file.name()
    }

    #[must_use]
    pub fn selected_at(&self) -> DateTime<Utc> {
        self.selected_at
    }

    /// Preview, once the asynchronous decode has landed
    #[must_use]
    pub fn preview(&self) -> Option<&PreviewImage> {
        self.preview.as_ref()
    }

    /// Attach the decoded preview. Returns false if one was already attached.
    pub(crate) fn attach_preview(&mut self, preview: PreviewImage) -> bool {
        if self.preview.is_some() {
            return false;
        }
        self.preview = Some(preview);
        true
    }
}

/// Background-removed image owned by the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    /// Releasable reference to the result bytes
    pub handle: BlobHandle,
    /// Selection the result was produced for
    pub source_id: SelectionId,
    /// Time spent in the removal capability
    pub processing_time_ms: u64,
}

/// Payload-free discriminant of [`WorkflowState`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    #[default]
    Idle,
    Loaded,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Kind of failure held by [`WorkflowState::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No file, or a non-image file, was supplied
    InvalidInput,
    /// The removal capability failed
    ProcessingFailure,
}

/// User-visible error held by the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorState {
    pub kind: FailureKind,
    pub message: String,
}

/// Workflow state with its associated data
///
/// Combinations such as "completed without a result" cannot be represented.
#[derive(Debug, Clone, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    /// A source is held; removal has not started
    Loaded { source: SourceImage },
    /// Removal is in flight for `source`
    Processing { source: SourceImage },
    /// Removal finished; `result` is live
    Completed {
        source: SourceImage,
        result: ProcessedImage,
    },
    /// An error is shown. A result can only survive here when an invalid
    /// selection arrived after completion. `in_flight` is set when the
    /// rejected selection arrived while removal was running for `source`;
    /// that run still lands.
    Failed {
        source: Option<SourceImage>,
        result: Option<ProcessedImage>,
        error: ErrorState,
        in_flight: bool,
    },
}

impl WorkflowState {
    #[must_use]
    pub fn phase(&self) -> WorkflowPhase {
        match self {
            Self::Idle => WorkflowPhase::Idle,
            Self::Loaded { .. } => WorkflowPhase::Loaded,
            Self::Processing { .. } => WorkflowPhase::Processing,
            Self::Completed { .. } => WorkflowPhase::Completed,
            Self::Failed { .. } => WorkflowPhase::Failed,
        }
    }

    #[must_use]
    pub fn source(&self) -> Option<&SourceImage> {
        match self {
            Self::Idle => None,
            Self::Loaded { source }
            | Self::Processing { source }
            | Self::Completed { source, .. } => Some(source),
            Self::Failed { source, .. } => source.as_ref(),
        }
    }

    pub(crate) fn source_mut(&mut self) -> Option<&mut SourceImage> {
        match self {
            Self::Idle => None,
            Self::Loaded { source }
            | Self::Processing { source }
            | Self::Completed { source, .. } => Some(source),
            Self::Failed { source, .. } => source.as_mut(),
        }
    }

    #[must_use]
    pub fn result(&self) -> Option<&ProcessedImage> {
        match self {
            Self::Completed { result, .. } => Some(result),
            Self::Failed { result, .. } => result.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&ErrorState> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Whether a removal run for the held source is still pending
    #[must_use]
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            Self::Processing { .. } | Self::Failed { in_flight: true, .. }
        )
    }

    /// Split into the held source and result, consuming the state
    pub(crate) fn into_parts(self) -> (Option<SourceImage>, Option<ProcessedImage>) {
        match self {
            Self::Idle => (None, None),
            Self::Loaded { source } | Self::Processing { source } => (Some(source), None),
            Self::Completed { source, result } => (Some(source), Some(result)),
            Self::Failed { source, result, .. } => (source, result),
        }
    }
}

/// Read-only view published to the presentation layer
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowSnapshot {
    pub phase: WorkflowPhase,
    pub source_name: Option<String>,
    pub source_id: Option<SelectionId>,
    #[serde(skip)]
    pub preview: Option<PreviewImage>,
    pub preview_dimensions: Option<(u32, u32)>,
    pub result: Option<BlobHandle>,
    pub error: Option<String>,
    pub is_processing: bool,
}

impl WorkflowSnapshot {
    /// Whether the download command is actionable
    #[must_use]
    pub fn can_download(&self) -> bool {
        self.phase == WorkflowPhase::Completed && self.result.is_some()
    }
}

impl From<&WorkflowState> for WorkflowSnapshot {
    fn from(state: &WorkflowState) -> Self {
        let source = state.source();
        let preview = source.and_then(|s| s.preview().cloned());
        Self {
            phase: state.phase(),
            source_name: source.map(|s| s.name().to_string()),
            source_id: source.map(SourceImage::id),
            preview_dimensions: preview.as_ref().and_then(|p| p.dimensions),
            preview,
            result: state.result().map(|r| r.handle.clone()),
            error: state.error().map(|e| e.message.clone()),
            is_processing: state.is_processing(),
        }
    }
}

/// How an accepted selection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The result was stored and the workflow is `Completed`
    Completed(BlobHandle),
    /// The capability failed and the workflow is `Failed`
    Failed,
    /// A newer selection, run or reset replaced this one; the outcome was discarded
    Superseded,
    /// The workflow was dropped before the outcome landed
    Detached,
    /// The source was loaded without starting removal (`auto_process` disabled)
    Loaded,
}

/// How a preview decode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// The preview was attached to the current source
    Attached,
    /// The source was replaced or reset before the preview landed
    Discarded,
    /// The decoder failed; the source stays without a preview
    Failed,
    /// No decode was started for this call
    NotRequested,
}

/// Result of `request_download`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    /// The result was handed to the download sink
    Saved { file_name: String, location: String },
    /// No completed result is held; nothing was done
    NotReady,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: u64) -> SourceImage {
        SourceImage::new(
            SelectionId(id),
            FileCandidate::new("cat.png", "image/png", vec![1, 2, 3]),
        )
    }

    #[test]
    fn test_file_candidate_accessors() {
        let file = FileCandidate::new("cat.png", "image/png", vec![9u8; 4]);
        assert_eq!(file.name(), "cat.png");
        assert_eq!(file.media_type(), "image/png");
        assert_eq!(file.len(), 4);
        assert!(!file.is_empty());

        let relabeled = file.clone().with_media_type("image/webp");
        assert_eq!(relabeled.media_type(), "image/webp");
        assert_eq!(relabeled.bytes(), file.bytes());
    }

    #[test]
    fn test_preview_attaches_once() {
        let mut src = source(1);
        let preview = PreviewImage {
            data_uri: Arc::from("data:image/png;base64,AQID"),
            media_type: "image/png".to_string(),
            dimensions: None,
        };
        assert!(src.attach_preview(preview.clone()));
        assert!(!src.attach_preview(preview));
        assert!(src.preview().is_some());
    }

    #[test]
    fn test_state_accessors() {
        let state = WorkflowState::Processing { source: source(2) };
        assert_eq!(state.phase(), WorkflowPhase::Processing);
        assert!(state.is_processing());
        assert!(state.result().is_none());
        assert_eq!(state.source().map(SourceImage::id), Some(SelectionId(2)));

        let failed = WorkflowState::Failed {
            source: None,
            result: None,
            error: ErrorState {
                kind: FailureKind::InvalidInput,
                message: "No file selected".to_string(),
            },
            in_flight: false,
        };
        assert_eq!(failed.phase(), WorkflowPhase::Failed);
        assert_eq!(failed.error().map(|e| e.message.as_str()), Some("No file selected"));
        assert!(!failed.is_processing());

        let rejected_mid_run = WorkflowState::Failed {
            source: Some(source(3)),
            result: None,
            error: ErrorState {
                kind: FailureKind::InvalidInput,
                message: "No file selected".to_string(),
            },
            in_flight: true,
        };
        assert_eq!(rejected_mid_run.phase(), WorkflowPhase::Failed);
        assert!(rejected_mid_run.is_processing());
    }

    #[test]
    fn test_snapshot_from_state() {
        let snapshot = WorkflowSnapshot::from(&WorkflowState::Idle);
        assert_eq!(snapshot.phase, WorkflowPhase::Idle);
        assert!(!snapshot.can_download());
        assert!(snapshot.source_name.is_none());

        let snapshot = WorkflowSnapshot::from(&WorkflowState::Loaded { source: source(3) });
        assert_eq!(snapshot.phase, WorkflowPhase::Loaded);
        assert_eq!(snapshot.source_name.as_deref(), Some("cat.png"));
        assert_eq!(snapshot.source_id, Some(SelectionId(3)));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(WorkflowPhase::Completed.to_string(), "completed");
        assert_eq!(SelectionId(7).to_string(), "sel-7");
    }
}
