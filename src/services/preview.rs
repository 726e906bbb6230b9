//! Preview decoding service
//!
//! Turns a selected file into something the presentation layer can render
//! immediately: a base64 `data:` URI of the original bytes. The decode never
//! fails on image content; a corrupt file still previews (as a broken image)
//! and is left for the removal capability to reject.

use crate::error::{Result, WorkflowError};
use crate::types::{FileCandidate, PreviewImage};
use async_trait::async_trait;
use base64::Engine;
use std::io::Cursor;
use std::sync::Arc;
use tracing::trace;

/// Media type used when the file source declared none
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Produces renderable previews for selected files
#[async_trait]
pub trait PreviewDecoder: Send + Sync {
    /// Decode `file` into a preview
    async fn decode(&self, file: &FileCandidate) -> Result<PreviewImage>;
}

/// Encodes the original bytes as a `data:` URI
#[derive(Debug, Clone, Copy)]
pub struct DataUriPreviewDecoder {
    probe_dimensions: bool,
}

impl DataUriPreviewDecoder {
    #[must_use]
    pub fn new(probe_dimensions: bool) -> Self {
        Self { probe_dimensions }
    }

    /// Build the preview synchronously
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_workflow::{services::DataUriPreviewDecoder, FileCandidate};
    ///
    /// let file = FileCandidate::new("dot.png", "image/png", vec![1, 2, 3]);
    /// let preview = DataUriPreviewDecoder::new(false).encode(&file);
    /// assert_eq!(&*preview.data_uri, "data:image/png;base64,AQID");
    /// ```
    #[must_use]
    pub fn encode(&self, file: &FileCandidate) -> PreviewImage {
        let media_type = normalized_media_type(file.media_type());
        let payload = base64::engine::general_purpose::STANDARD.encode(file.bytes());
        let data_uri = format!("data:{media_type};base64,{payload}");

        let dimensions = if self.probe_dimensions {
            probe_dimensions(file.bytes())
        } else {
            None
        };
        trace!(
            file_name = %file.name(),
            uri_len = data_uri.len(),
            ?dimensions,
            "Encoded preview"
        );

        PreviewImage {
            data_uri: Arc::from(data_uri),
            media_type,
            dimensions,
        }
    }
}

impl Default for DataUriPreviewDecoder {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl PreviewDecoder for DataUriPreviewDecoder {
    async fn decode(&self, file: &FileCandidate) -> Result<PreviewImage> {
        let decoder = *self;
        let file = file.clone();
        tokio::task::spawn_blocking(move || decoder.encode(&file))
            .await
            .map_err(|e| WorkflowError::internal(format!("Preview encoding task failed: {e}")))
    }
}

fn normalized_media_type(declared: &str) -> String {
    let trimmed = declared.trim();
    if trimmed.is_empty() {
        FALLBACK_MEDIA_TYPE.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Read pixel dimensions from the image header without decoding pixels
fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
