//! Background-removal capability abstraction

use crate::types::FileCandidate;
use async_trait::async_trait;

/// Opaque capability that strips the background from an image
///
/// Implementations receive the raw file exactly as selected and return the
/// encoded result (PNG unless the workflow is configured otherwise). Failure
/// causes are opaque to the workflow: they are logged, never shown to users.
/// There is no cancellation; a superseded call simply runs to completion and
/// its outcome is discarded.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Remove the background from `file`
    async fn remove_background(&self, file: &FileCandidate) -> anyhow::Result<Vec<u8>>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "background-remover"
    }
}
