//! Service layer for the workflow's external collaborators
//!
//! Each service sits behind a trait so the workflow can be driven by a
//! terminal front end, an embedding application, or test doubles.

pub mod download;
pub mod events;
pub mod preview;
pub mod source;

pub use download::{DownloadSink, FsDownloadSink};
pub use events::{NoOpObserver, RecordingObserver, TracingObserver, WorkflowEvent, WorkflowObserver};
pub use preview::{DataUriPreviewDecoder, PreviewDecoder};
pub use source::{DroppedFiles, FileSource};
