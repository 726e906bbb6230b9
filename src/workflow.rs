//! Image workflow state machine
//!
//! [`ImageWorkflow`] owns the selected source, the in-flight removal run and
//! the processed result. Commands mutate state synchronously under a lock.
//! Preview decodes and removal calls run as spawned tasks and land through
//! `apply_preview` / `apply_removal`, which discard anything that no longer
//! belongs to the current selection or run.
//!
//! Spawned tasks only hold a weak reference to the workflow, so dropping the
//! [`ImageWorkflow`] tears it down: the held result handle is released and
//! late outcomes find nothing to apply to.

use crate::config::WorkflowConfig;
use crate::error::{Result, WorkflowError};
use crate::handles::{BlobStore, BlobStoreStats, InMemoryBlobStore};
use crate::remover::BackgroundRemover;
use crate::services::{
    DataUriPreviewDecoder, DownloadSink, FsDownloadSink, PreviewDecoder, WorkflowEvent,
    WorkflowObserver,
};
use crate::types::{
    DownloadStatus, ErrorState, FailureKind, FileCandidate, PreviewImage, PreviewOutcome,
    ProcessedImage, SelectionId, SelectionOutcome, SourceImage, WorkflowPhase, WorkflowSnapshot,
    WorkflowState,
};
use crate::utils::{ConfigValidator, MediaTypeValidator};
use futures::FutureExt;
use instant::Instant;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Mutable workflow state, guarded by `Shared::inner`
#[derive(Default)]
struct Inner {
    state: WorkflowState,
    last_selection: u64,
    last_run: u64,
    /// Run whose outcome may still be applied; 0 when none
    active_run: u64,
}

impl Inner {
    fn next_selection(&mut self) -> SelectionId {
        self.last_selection += 1;
        SelectionId(self.last_selection)
    }

    fn begin_run(&mut self) -> u64 {
        self.last_run += 1;
        self.active_run = self.last_run;
        self.last_run
    }
}

struct Shared {
    config: WorkflowConfig,
    remover: Arc<dyn BackgroundRemover>,
    preview_decoder: Arc<dyn PreviewDecoder>,
    blob_store: Arc<dyn BlobStore>,
    download_sink: Arc<dyn DownloadSink>,
    observers: Vec<Arc<dyn WorkflowObserver>>,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<WorkflowSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the phase change (if any) and publish a fresh snapshot
    ///
    /// Called with the lock held so snapshots are published in state order.
    fn commit(&self, inner: &Inner, from: WorkflowPhase, events: &mut Vec<WorkflowEvent>) {
        let to = inner.state.phase();
        if from != to {
            debug!(from = %from, to = %to, "Workflow state changed");
            events.push(WorkflowEvent::StateChanged { from, to });
        }
        self.snapshots
            .send_replace(WorkflowSnapshot::from(&inner.state));
    }

    /// Notify observers. Must be called without the lock held.
    fn emit(&self, events: Vec<WorkflowEvent>) {
        for event in &events {
            for observer in &self.observers {
                observer.on_event(event);
            }
        }
    }

    fn release_result(&self, result: ProcessedImage, events: &mut Vec<WorkflowEvent>) {
        match self.blob_store.release(&result.handle) {
            Ok(()) => events.push(WorkflowEvent::HandleReleased {
                handle: result.handle,
            }),
            Err(e) => error!(url = %result.handle.url(), error = %e, "Failed to release result handle"),
        }
    }

    async fn run_preview(
        shared: Weak<Self>,
        decoder: Arc<dyn PreviewDecoder>,
        file: FileCandidate,
        selection: SelectionId,
    ) -> PreviewOutcome {
        let decoded = decoder.decode(&file).await;
        match shared.upgrade() {
            Some(shared) => shared.apply_preview(selection, decoded),
            None => PreviewOutcome::Discarded,
        }
    }

    async fn run_removal(
        shared: Weak<Self>,
        remover: Arc<dyn BackgroundRemover>,
        file: FileCandidate,
        selection: SelectionId,
        run: u64,
    ) -> SelectionOutcome {
        let start = Instant::now();
        let removed = match AssertUnwindSafe(remover.remove_background(&file))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(anyhow::anyhow!(
                "{} panicked: {}",
                remover.name(),
                panic_message(payload.as_ref())
            )),
        };
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match shared.upgrade() {
            Some(shared) => shared.apply_removal(selection, run, removed, elapsed_ms),
            None => {
                debug!(selection = %selection, run, "Workflow dropped before removal finished");
                SelectionOutcome::Detached
            },
        }
    }

    fn apply_preview(&self, selection: SelectionId, decoded: Result<PreviewImage>) -> PreviewOutcome {
        let mut events = Vec::new();
        let mut inner = self.lock();
        let from = inner.state.phase();

        let outcome = match inner.state.source_mut() {
            Some(source) if source.id() == selection => match decoded {
                Ok(preview) => {
                    if source.attach_preview(preview) {
                        events.push(WorkflowEvent::PreviewReady { selection });
                        PreviewOutcome::Attached
                    } else {
                        PreviewOutcome::Discarded
                    }
                },
                Err(e) => {
                    warn!(selection = %selection, error = %e, "Preview decode failed");
                    PreviewOutcome::Failed
                },
            },
            _ => {
                debug!(selection = %selection, "Discarding preview for replaced source");
                events.push(WorkflowEvent::PreviewDiscarded { selection });
                PreviewOutcome::Discarded
            },
        };

        if outcome == PreviewOutcome::Attached {
            self.commit(&inner, from, &mut events);
        }
        drop(inner);
        self.emit(events);
        outcome
    }

    fn apply_removal(
        &self,
        selection: SelectionId,
        run: u64,
        removed: anyhow::Result<Vec<u8>>,
        elapsed_ms: u64,
    ) -> SelectionOutcome {
        let mut events = Vec::new();
        let mut inner = self.lock();
        let from = inner.state.phase();

        let current = if inner.active_run == run {
            match std::mem::take(&mut inner.state) {
                WorkflowState::Processing { source } => Some((source, None)),
                WorkflowState::Failed {
                    source: Some(source),
                    result,
                    in_flight: true,
                    ..
                } => Some((source, result)),
                other => {
                    inner.state = other;
                    None
                },
            }
        } else {
            None
        };

        let Some((source, stale_result)) = current else {
            debug!(
                selection = %selection,
                run,
                active_run = inner.active_run,
                "Discarding stale removal outcome"
            );
            drop(inner);
            self.emit(vec![WorkflowEvent::ResultDiscarded { selection, run }]);
            return SelectionOutcome::Superseded;
        };

        inner.active_run = 0;
        if let Some(result) = stale_result {
            self.release_result(result, &mut events);
        }

        let outcome = match removed {
            Ok(bytes) => {
                let handle = self.blob_store.create(bytes, &self.config.result_media_type);
                info!(
                    selection = %selection,
                    run,
                    url = %handle.url(),
                    size_bytes = handle.size_bytes(),
                    processing_time_ms = elapsed_ms,
                    "Background removed"
                );
                events.push(WorkflowEvent::ResultReady {
                    selection,
                    handle: handle.clone(),
                });
                inner.state = WorkflowState::Completed {
                    source,
                    result: ProcessedImage {
                        handle: handle.clone(),
                        source_id: selection,
                        processing_time_ms: elapsed_ms,
                    },
                };
                SelectionOutcome::Completed(handle)
            },
            Err(e) => {
                let cause = format!("{e:#}");
                error!(selection = %selection, run, error = %cause, "Background removal failed");
                events.push(WorkflowEvent::ProcessingFailed { selection });
                inner.state = WorkflowState::Failed {
                    source: Some(source),
                    result: None,
                    error: ErrorState {
                        kind: FailureKind::ProcessingFailure,
                        message: self.config.processing_failure_message.clone(),
                    },
                    in_flight: false,
                };
                SelectionOutcome::Failed
            },
        };

        self.commit(&inner, from, &mut events);
        drop(inner);
        self.emit(events);
        outcome
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        let (_, result) = std::mem::take(&mut inner.state).into_parts();
        if let Some(result) = result {
            let mut events = Vec::new();
            self.release_result(result, &mut events);
            self.emit(events);
        }
        debug!("Image workflow torn down");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn current_runtime(operation: &str) -> Result<Handle> {
    Handle::try_current()
        .map_err(|_| WorkflowError::internal(format!("{operation} must be called within a Tokio runtime")))
}

/// Tasks started by an accepted selection or a `process` call
///
/// Dropping this does not cancel anything; the tasks keep running and their
/// outcomes are still applied (or discarded) by the workflow.
#[derive(Debug)]
pub struct PendingSelection {
    selection: SelectionId,
    run: Option<u64>,
    preview: Option<JoinHandle<PreviewOutcome>>,
    removal: Option<JoinHandle<SelectionOutcome>>,
}

impl PendingSelection {
    #[must_use]
    pub fn selection(&self) -> SelectionId {
        self.selection
    }

    /// Removal run token, if a removal was started
    #[must_use]
    pub fn run(&self) -> Option<u64> {
        self.run
    }

    /// Wait for the removal outcome
    pub async fn wait(self) -> SelectionOutcome {
        join_removal(self.removal).await
    }

    /// Wait for both the preview decode and the removal outcome
    pub async fn wait_with_preview(self) -> (SelectionOutcome, PreviewOutcome) {
        let preview = match self.preview {
            Some(task) => task.await.unwrap_or_else(|e| {
                warn!(error = %e, "Preview task did not complete");
                PreviewOutcome::Discarded
            }),
            None => PreviewOutcome::NotRequested,
        };
        (join_removal(self.removal).await, preview)
    }
}

async fn join_removal(task: Option<JoinHandle<SelectionOutcome>>) -> SelectionOutcome {
    match task {
        Some(task) => task.await.unwrap_or_else(|e| {
            warn!(error = %e, "Removal task did not complete");
            SelectionOutcome::Detached
        }),
        None => SelectionOutcome::Loaded,
    }
}

/// Select, process and download workflow for a single image
///
/// # Examples
/// ```rust,no_run
/// use bgremove_workflow::{
///     backends::MockRemover, DownloadStatus, FileCandidate, ImageWorkflow, SelectionOutcome,
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let workflow = ImageWorkflow::builder(Arc::new(MockRemover::echoing())).build()?;
/// let file = FileCandidate::new("cat.png", "image/png", std::fs::read("cat.png")?);
///
/// let outcome = workflow.select_file(Some(file))?.wait().await;
/// assert!(matches!(outcome, SelectionOutcome::Completed(_)));
///
/// if let DownloadStatus::Saved { location, .. } = workflow.request_download().await? {
///     println!("saved to {location}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct ImageWorkflow {
    shared: Arc<Shared>,
}

impl ImageWorkflow {
    /// Start building a workflow around a removal capability
    pub fn builder(remover: Arc<dyn BackgroundRemover>) -> ImageWorkflowBuilder {
        ImageWorkflowBuilder::new(remover)
    }

    /// Workflow with default configuration and collaborators
    ///
    /// # Errors
    /// Fails only if the default configuration is invalid.
    pub fn new(remover: Arc<dyn BackgroundRemover>) -> Result<Self> {
        Self::builder(remover).build()
    }

    /// Offer a file to the workflow
    ///
    /// A missing file or one whose declared media type is not `image/*` moves
    /// the workflow to `Failed` with the configured invalid-input message and
    /// returns `WorkflowError::InvalidInput`. The held source and result are
    /// kept and any in-flight run continues.
    ///
    /// An accepted file releases the previous result, becomes the current
    /// source, starts a preview decode and (unless `auto_process` is off) a
    /// removal run. Everything still pending for earlier selections is
    /// superseded.
    ///
    /// # Errors
    /// - `WorkflowError::InvalidInput` for a rejected selection
    /// - `WorkflowError::Internal` when called outside a Tokio runtime (no
    ///   state is changed)
    pub fn select_file(&self, candidate: Option<FileCandidate>) -> Result<PendingSelection> {
        let runtime = current_runtime("select_file")?;
        let shared = &self.shared;
        let mut events = Vec::new();
        let mut inner = shared.lock();
        let from = inner.state.phase();

        let message = &shared.config.invalid_input_message;
        let checked = match candidate {
            Some(file) => match MediaTypeValidator::validate_image(file.media_type(), message) {
                Ok(()) => Ok(file),
                Err(e) => {
                    warn!(
                        file_name = %file.name(),
                        media_type = %file.media_type(),
                        "Rejected non-image selection"
                    );
                    Err(e)
                },
            },
            None => {
                warn!("Rejected empty selection");
                Err(WorkflowError::invalid_input(message.as_str()))
            },
        };

        let file = match checked {
            Ok(file) => file,
            Err(rejection) => {
                // A running removal is left alone and still lands
                let in_flight = inner.active_run != 0;
                let (source, result) = std::mem::take(&mut inner.state).into_parts();
                inner.state = WorkflowState::Failed {
                    source,
                    result,
                    error: ErrorState {
                        kind: FailureKind::InvalidInput,
                        message: message.clone(),
                    },
                    in_flight,
                };
                events.push(WorkflowEvent::SelectionRejected {
                    message: message.clone(),
                });
                shared.commit(&inner, from, &mut events);
                drop(inner);
                shared.emit(events);
                return Err(rejection);
            },
        };

        let (_, stale_result) = std::mem::take(&mut inner.state).into_parts();
        if let Some(result) = stale_result {
            shared.release_result(result, &mut events);
        }

        let selection = inner.next_selection();
        events.push(WorkflowEvent::SelectionAccepted {
            selection,
            file_name: file.name().to_string(),
        });
        let source = SourceImage::new(selection, file.clone());
        let run = if shared.config.auto_process {
            let run = inner.begin_run();
            events.push(WorkflowEvent::ProcessingStarted { selection, run });
            inner.state = WorkflowState::Processing { source };
            Some(run)
        } else {
            inner.active_run = 0;
            inner.state = WorkflowState::Loaded { source };
            None
        };
        shared.commit(&inner, from, &mut events);
        drop(inner);
        shared.emit(events);

        info!(
            selection = %selection,
            file_name = %file.name(),
            media_type = %file.media_type(),
            size_bytes = file.len(),
            "Selection accepted"
        );

        let span = info_span!("selection", selection = %selection, file_name = %file.name());
        let preview = runtime.spawn(
            Shared::run_preview(
                Arc::downgrade(&self.shared),
                Arc::clone(&shared.preview_decoder),
                file.clone(),
                selection,
            )
            .instrument(span.clone()),
        );
        let removal = run.map(|run| self.spawn_removal(&runtime, file, selection, run, span));

        Ok(PendingSelection {
            selection,
            run,
            preview: Some(preview),
            removal,
        })
    }

    /// Start removal for the held source
    ///
    /// Allowed from `Loaded`, and from `Failed` while a source is held and no
    /// removal is pending for it (a retry). Any result still held is released
    /// first.
    ///
    /// # Errors
    /// - `WorkflowError::NotReady` in any other state
    /// - `WorkflowError::Internal` when called outside a Tokio runtime
    pub fn process(&self) -> Result<PendingSelection> {
        let runtime = current_runtime("process")?;
        let shared = &self.shared;
        let mut events = Vec::new();
        let mut inner = shared.lock();
        let from = inner.state.phase();

        let (source, stale_result) = match std::mem::take(&mut inner.state) {
            WorkflowState::Loaded { source } => (source, None),
            WorkflowState::Failed {
                source: Some(source),
                result,
                in_flight: false,
                ..
            } => (source, result),
            other => {
                let reason = if other.is_processing() {
                    "removal is already running".to_string()
                } else {
                    format!("no source to process while {from}")
                };
                inner.state = other;
                return Err(WorkflowError::not_ready(reason));
            },
        };
        if let Some(result) = stale_result {
            shared.release_result(result, &mut events);
        }

        let selection = source.id();
        let file = source.file().clone();
        let run = inner.begin_run();
        events.push(WorkflowEvent::ProcessingStarted { selection, run });
        inner.state = WorkflowState::Processing { source };
        shared.commit(&inner, from, &mut events);
        drop(inner);
        shared.emit(events);

        let span = info_span!("selection", selection = %selection, file_name = %file.name());
        let removal = self.spawn_removal(&runtime, file, selection, run, span);
        Ok(PendingSelection {
            selection,
            run: Some(run),
            preview: None,
            removal: Some(removal),
        })
    }

    fn spawn_removal(
        &self,
        runtime: &Handle,
        file: FileCandidate,
        selection: SelectionId,
        run: u64,
        span: tracing::Span,
    ) -> JoinHandle<SelectionOutcome> {
        runtime.spawn(
            Shared::run_removal(
                Arc::downgrade(&self.shared),
                Arc::clone(&self.shared.remover),
                file,
                selection,
                run,
            )
            .instrument(span),
        )
    }

    /// Return to `Idle`, releasing any held result
    ///
    /// In-flight previews and removal runs are superseded. Calling this while
    /// already idle changes nothing.
    pub fn reset(&self) {
        let shared = &self.shared;
        let mut events = Vec::new();
        let mut inner = shared.lock();
        let from = inner.state.phase();

        inner.active_run = 0;
        let (_, result) = std::mem::take(&mut inner.state).into_parts();
        if let Some(result) = result {
            shared.release_result(result, &mut events);
        }
        events.push(WorkflowEvent::Reset);
        shared.commit(&inner, from, &mut events);
        drop(inner);
        shared.emit(events);
    }

    /// Hand the completed result to the download sink
    ///
    /// Outside `Completed` nothing is saved and `DownloadStatus::NotReady` is
    /// returned. State is never changed.
    ///
    /// # Errors
    /// Propagates download sink failures (for example an unwritable directory).
    pub async fn request_download(&self) -> Result<DownloadStatus> {
        let file_name = self.shared.config.download_file_name.clone();
        self.save_result(file_name).await
    }

    /// Like [`request_download`](Self::request_download), under a caller-chosen file name
    ///
    /// # Errors
    /// - `WorkflowError::InvalidConfig` for an empty name or one with path separators
    /// - download sink failures
    pub async fn request_download_as(&self, file_name: &str) -> Result<DownloadStatus> {
        ConfigValidator::validate_file_name(file_name)?;
        self.save_result(file_name.to_string()).await
    }

    async fn save_result(&self, file_name: String) -> Result<DownloadStatus> {
        let shared = &self.shared;
        let handle = match &shared.lock().state {
            WorkflowState::Completed { result, .. } => Some(result.handle.clone()),
            _ => None,
        };
        let readable = handle.and_then(|handle| {
            let bytes = shared.blob_store.read(&handle)?;
            Some((handle, bytes))
        });
        let Some((handle, bytes)) = readable else {
            debug!("Download requested without a completed result");
            shared.emit(vec![WorkflowEvent::DownloadNotReady]);
            return Ok(DownloadStatus::NotReady);
        };

        let location = shared
            .download_sink
            .save(&file_name, handle.media_type(), &bytes)
            .await?;
        info!(file_name = %file_name, location = %location, "Download saved");
        shared.emit(vec![WorkflowEvent::DownloadSaved {
            file_name: file_name.clone(),
            location: location.clone(),
        }]);
        Ok(DownloadStatus::Saved {
            file_name,
            location,
        })
    }

    /// Current read-only view
    #[must_use]
    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    /// Receive a snapshot after every state change
    ///
    /// Do not hold a `borrow()` of the receiver while calling workflow
    /// commands; publishing waits for outstanding borrows.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Clone of the full state
    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.shared.lock().state.clone()
    }

    #[must_use]
    pub fn phase(&self) -> WorkflowPhase {
        self.shared.lock().state.phase()
    }

    /// Bytes of the held result, while its handle is live
    #[must_use]
    pub fn read_result(&self) -> Option<Arc<[u8]>> {
        let handle = self.shared.lock().state.result().map(|r| r.handle.clone())?;
        self.shared.blob_store.read(&handle)
    }

    /// Usage counters of the blob store backing result handles
    #[must_use]
    pub fn blob_stats(&self) -> BlobStoreStats {
        self.shared.blob_store.stats()
    }

    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.shared.config
    }

    /// Name of the removal capability
    #[must_use]
    pub fn remover_name(&self) -> &str {
        self.shared.remover.name()
    }
}

impl fmt::Debug for ImageWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageWorkflow")
            .field("remover", &self.remover_name())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ImageWorkflow`]
pub struct ImageWorkflowBuilder {
    remover: Arc<dyn BackgroundRemover>,
    config: WorkflowConfig,
    preview_decoder: Option<Arc<dyn PreviewDecoder>>,
    blob_store: Option<Arc<dyn BlobStore>>,
    download_sink: Option<Arc<dyn DownloadSink>>,
    observers: Vec<Arc<dyn WorkflowObserver>>,
}

impl ImageWorkflowBuilder {
    #[must_use]
    pub fn new(remover: Arc<dyn BackgroundRemover>) -> Self {
        Self {
            remover,
            config: WorkflowConfig::default(),
            preview_decoder: None,
            blob_store: None,
            download_sink: None,
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to [`DataUriPreviewDecoder`] honoring `probe_preview_dimensions`
    #[must_use]
    pub fn preview_decoder(mut self, decoder: Arc<dyn PreviewDecoder>) -> Self {
        self.preview_decoder = Some(decoder);
        self
    }

    /// Defaults to a fresh [`InMemoryBlobStore`]
    #[must_use]
    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    /// Defaults to [`FsDownloadSink`] writing into the configured download directory
    #[must_use]
    pub fn download_sink(mut self, sink: Arc<dyn DownloadSink>) -> Self {
        self.download_sink = Some(sink);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Validate the configuration and build the workflow
    ///
    /// # Errors
    /// Returns `WorkflowError::InvalidConfig` when the configuration is invalid.
    pub fn build(self) -> Result<ImageWorkflow> {
        self.config.validate()?;

        let preview_decoder = self.preview_decoder.unwrap_or_else(|| {
            Arc::new(DataUriPreviewDecoder::new(
                self.config.probe_preview_dimensions,
            ))
        });
        let blob_store = self
            .blob_store
            .unwrap_or_else(|| Arc::new(InMemoryBlobStore::new()));
        let download_sink = self
            .download_sink
            .unwrap_or_else(|| Arc::new(FsDownloadSink::new(self.config.resolved_download_dir())));
        let (snapshots, _) = watch::channel(WorkflowSnapshot::default());

        info!(
            remover = %self.remover.name(),
            auto_process = self.config.auto_process,
            observers = self.observers.len(),
            "Image workflow ready"
        );

        Ok(ImageWorkflow {
            shared: Arc::new(Shared {
                config: self.config,
                remover: self.remover,
                preview_decoder,
                blob_store,
                download_sink,
                observers: self.observers,
                inner: Mutex::new(Inner::default()),
                snapshots,
            }),
        })
    }
}
