//! Background-removal capability implementations
//!
//! This module provides the capabilities the workflow can delegate to:
//! - External command backend (pipes the image through a program such as `imgly-bgremove`)
//! - Closure backend (for applications embedding their own removal call)
//! - Mock backends (deterministic doubles for tests and debugging)

pub mod closure;
pub mod command;
pub mod mock;

pub use self::closure::FnRemover;
pub use self::command::CommandRemover;
pub use self::mock::{
    GatedPreviewDecoder, GatedRemover, MemoryDownloadSink, MockRemover, SavedDownload,
};
