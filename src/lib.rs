#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]

//! # Background Removal Workflow
//!
//! Orchestration for "select an image, remove its background, download the
//! result" front ends. The crate does not segment images itself: removal is
//! delegated to a [`BackgroundRemover`] capability (an external command such
//! as `imgly-bgremove`, a closure, or a test double). What the crate owns is
//! the flow around it:
//!
//! - **Validation**: only files declaring an `image/*` media type are accepted
//! - **Previews**: a renderable `data:` URI is produced while removal runs
//! - **Latest selection wins**: outcomes of superseded selections are discarded
//! - **Resource discipline**: every result lives behind a releasable
//!   [`BlobHandle`], released exactly once when replaced, reset or torn down
//! - **Presentation**: a [`WorkflowSnapshot`] is published on every change, and
//!   [`WorkflowObserver`]s receive [`WorkflowEvent`]s
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_workflow::{
//!     backends::CommandRemover, services::FileSource, DownloadStatus, ImageWorkflow,
//!     SelectionOutcome,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let remover = CommandRemover::from_command_line("imgly-bgremove - -o -")?;
//! let workflow = ImageWorkflow::builder(Arc::new(remover)).build()?;
//!
//! let file = FileSource::from_path("cat.png").await?;
//! match workflow.select_file(Some(file))?.wait().await {
//!     SelectionOutcome::Completed(handle) => println!("result at {}", handle.url()),
//!     other => println!("no result: {other:?}"),
//! }
//!
//! if let DownloadStatus::Saved { location, .. } = workflow.request_download().await? {
//!     println!("saved to {location}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Observing state
//!
//! ```rust,no_run
//! use bgremove_workflow::{backends::MockRemover, ImageWorkflow};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let workflow = ImageWorkflow::new(Arc::new(MockRemover::echoing()))?;
//! let mut snapshots = workflow.subscribe();
//! tokio::spawn(async move {
//!     while snapshots.changed().await.is_ok() {
//!         let snapshot = snapshots.borrow_and_update().clone();
//!         println!("{} processing={}", snapshot.phase, snapshot.is_processing);
//!     }
//! });
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line front end and tracing subscriber setup
//! - `tracing-json`: JSON log output for the CLI
//! - `webp-support`: WebP dimension probing for previews
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! bgremove-workflow = { version = "0.1", default-features = false }
//! ```

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod handles;
pub mod remover;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;
pub mod workflow;

// Public API exports
pub use backends::{CommandRemover, FnRemover};
pub use config::{WorkflowConfig, WorkflowConfigBuilder};
pub use error::{Result, WorkflowError};
pub use handles::{BlobHandle, BlobStore, BlobStoreStats, InMemoryBlobStore};
pub use remover::BackgroundRemover;
pub use services::{
    DataUriPreviewDecoder, DownloadSink, DroppedFiles, FileSource, FsDownloadSink, NoOpObserver,
    PreviewDecoder, RecordingObserver, TracingObserver, WorkflowEvent, WorkflowObserver,
};
pub use types::{
    DownloadStatus, ErrorState, FailureKind, FileCandidate, PreviewImage, PreviewOutcome,
    ProcessedImage, SelectionId, SelectionOutcome, SourceImage, WorkflowPhase, WorkflowSnapshot,
    WorkflowState,
};
pub use utils::{ConfigValidator, MediaTypeValidator};
pub use workflow::{ImageWorkflow, ImageWorkflowBuilder, PendingSelection};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};
