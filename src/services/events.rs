//! Workflow event reporting
//!
//! Separates "what happened" notifications from the workflow itself so that
//! front ends can log, animate or record transitions in their own way.

use crate::handles::BlobHandle;
use crate::types::{SelectionId, WorkflowPhase};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Notifications emitted by the workflow, in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// The workflow moved between phases
    StateChanged {
        from: WorkflowPhase,
        to: WorkflowPhase,
    },
    /// A selection was refused (no file, or not an image)
    SelectionRejected { message: String },
    /// A selection was accepted and became the current source
    SelectionAccepted {
        selection: SelectionId,
        file_name: String,
    },
    /// A removal call was started
    ProcessingStarted { selection: SelectionId, run: u64 },
    /// The preview for the current source landed
    PreviewReady { selection: SelectionId },
    /// A preview for a replaced source was dropped
    PreviewDiscarded { selection: SelectionId },
    /// The removal result was stored behind `handle`
    ResultReady {
        selection: SelectionId,
        handle: BlobHandle,
    },
    /// The outcome of a superseded run was dropped
    ResultDiscarded { selection: SelectionId, run: u64 },
    /// The removal capability failed
    ProcessingFailed { selection: SelectionId },
    /// A result handle was released
    HandleReleased { handle: BlobHandle },
    /// The held result was handed to the download sink
    DownloadSaved { file_name: String, location: String },
    /// A download was requested with nothing to save
    DownloadNotReady,
    /// The workflow returned to idle
    Reset,
}

/// Receives workflow events
pub trait WorkflowObserver: Send + Sync {
    /// Called after the state change that produced `event` has been applied
    fn on_event(&self, event: &WorkflowEvent);
}

/// Observer that discards all events
pub struct NoOpObserver;

impl WorkflowObserver for NoOpObserver {
    fn on_event(&self, _event: &WorkflowEvent) {
        // Intentionally empty - discards events
    }
}

/// Observer that logs events through `tracing`
pub struct TracingObserver;

impl WorkflowObserver for TracingObserver {
    fn on_event(&self, event: &WorkflowEvent) {
        match event {
            WorkflowEvent::StateChanged { from, to } => {
                debug!(from = %from, to = %to, "Workflow state changed");
            },
            WorkflowEvent::SelectionRejected { message } => {
                warn!(message = %message, "Selection rejected");
            },
            WorkflowEvent::SelectionAccepted {
                selection,
                file_name,
            } => {
                info!(selection = %selection, file_name = %file_name, "📸 Image selected");
            },
            WorkflowEvent::ProcessingStarted { selection, run } => {
                info!(selection = %selection, run, "🪄 Removing background");
            },
            WorkflowEvent::PreviewReady { selection } => {
                debug!(selection = %selection, "Preview ready");
            },
            WorkflowEvent::PreviewDiscarded { selection } => {
                debug!(selection = %selection, "Discarded stale preview");
            },
            WorkflowEvent::ResultReady { selection, handle } => {
                info!(
                    selection = %selection,
                    url = %handle.url(),
                    size_bytes = handle.size_bytes(),
                    "✅ Background removed"
                );
            },
            WorkflowEvent::ResultDiscarded { selection, run } => {
                debug!(selection = %selection, run, "Discarded stale result");
            },
            WorkflowEvent::ProcessingFailed { selection } => {
                error!(selection = %selection, "❌ Background removal failed");
            },
            WorkflowEvent::HandleReleased { handle } => {
                debug!(url = %handle.url(), "Released result handle");
            },
            WorkflowEvent::DownloadSaved {
                file_name,
                location,
            } => {
                info!(file_name = %file_name, location = %location, "💾 Download saved");
            },
            WorkflowEvent::DownloadNotReady => {
                debug!("Download requested without a completed result");
            },
            WorkflowEvent::Reset => {
                info!("🔄 Workflow reset");
            },
        }
    }
}

/// Observer that keeps every event, for inspection by tests and front ends
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sequence of phases entered, starting with the first transition target
    pub fn phases(&self) -> Vec<WorkflowPhase> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                WorkflowEvent::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    /// Handles released so far, in release order
    pub fn released_handles(&self) -> Vec<BlobHandle> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                WorkflowEvent::HandleReleased { handle } => Some(handle),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl WorkflowObserver for RecordingObserver {
    fn on_event(&self, event: &WorkflowEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
