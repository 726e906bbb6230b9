//! Configuration value validation

use super::MediaTypeValidator;
use crate::error::{Result, WorkflowError};

/// Validator for `WorkflowConfig` fields
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a download file name
    ///
    /// The name is handed to a save-as action, so it must be a bare file name:
    /// non-empty and free of path separators.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_workflow::utils::ConfigValidator;
    ///
    /// assert!(ConfigValidator::validate_file_name("processed-image.png").is_ok());
    /// assert!(ConfigValidator::validate_file_name("../escape.png").is_err());
    /// assert!(ConfigValidator::validate_file_name("").is_err());
    /// ```
    pub fn validate_file_name(name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
            return Err(WorkflowError::config_value_error(
                "download_file_name",
                name,
                "a non-empty file name",
            ));
        }
        if trimmed.contains(['/', '\\']) {
            return Err(WorkflowError::config_value_error(
                "download_file_name",
                name,
                "a file name without path separators",
            ));
        }
        Ok(())
    }

    /// Validate the media type used for result handles
    pub fn validate_result_media_type(media_type: &str) -> Result<()> {
        if MediaTypeValidator::is_image(media_type) {
            Ok(())
        } else {
            Err(WorkflowError::config_value_error(
                "result_media_type",
                media_type,
                "an image/* media type",
            ))
        }
    }

    /// Validate a user-visible message
    pub fn validate_message(field: &str, message: &str) -> Result<()> {
        if message.trim().is_empty() {
            return Err(WorkflowError::config_value_error(
                field,
                message,
                "a non-empty message",
            ));
        }
        Ok(())
    }
}
