//! Media type validation for file candidates

use crate::error::{Result, WorkflowError};
use image::ImageFormat;
use std::path::Path;

/// Prefix every accepted declared media type starts with
const IMAGE_MEDIA_PREFIX: &str = "image/";

/// Media types the `image` crate does not know about but browsers still label as images
const EXTRA_IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("svg", "image/svg+xml"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("jxl", "image/jxl"),
];

/// Validator for declared media types
pub struct MediaTypeValidator;

impl MediaTypeValidator {
    /// Check whether a declared media type names an image
    ///
    /// Only the declared type is inspected, never the bytes: a `.png` renamed to
    /// `.pdf` and declared `application/pdf` is rejected, and garbage bytes
    /// declared `image/png` are accepted and left for the removal capability
    /// to reject.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_workflow::utils::MediaTypeValidator;
    ///
    /// assert!(MediaTypeValidator::is_image("image/png"));
    /// assert!(MediaTypeValidator::is_image("IMAGE/WEBP"));
    /// assert!(!MediaTypeValidator::is_image("application/pdf"));
    /// assert!(!MediaTypeValidator::is_image(""));
    /// ```
    #[must_use]
    pub fn is_image(media_type: &str) -> bool {
        media_type
            .trim()
            .get(..IMAGE_MEDIA_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(IMAGE_MEDIA_PREFIX))
    }

    /// Validate a declared media type, returning an `InvalidInput` error with `message`
    pub fn validate_image(media_type: &str, message: &str) -> Result<()> {
        if Self::is_image(media_type) {
            Ok(())
        } else {
            Err(WorkflowError::invalid_input(message))
        }
    }

    /// Detect an image media type from the leading bytes
    ///
    /// Used for streamed input, where no file name is available to guess from.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
        image::guess_format(bytes)
            .ok()
            .map(|format| format.to_mime_type())
    }

    /// Guess the media type a file picker would declare for `path`
    ///
    /// Returns an empty string for unknown extensions, matching what a browser
    /// reports for files it cannot classify.
    #[must_use]
    pub fn guess_from_path(path: &Path) -> String {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return String::new();
        };

        if let Some(format) = ImageFormat::from_extension(extension) {
            return format.to_mime_type().to_string();
        }

        let lower = extension.to_ascii_lowercase();
        if let Some((_, media_type)) = EXTRA_IMAGE_EXTENSIONS
            .iter()
            .find(|(ext, _)| *ext == lower)
        {
            return (*media_type).to_string();
        }

        match lower.as_str() {
            "pdf" => "application/pdf".to_string(),
            "txt" => "text/plain".to_string(),
            "json" => "application/json".to_string(),
            "mp4" => "video/mp4".to_string(),
            _ => String::new(),
        }
    }
}
