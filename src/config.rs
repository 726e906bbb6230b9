//! Configuration types for the image workflow

use crate::error::{Result, WorkflowError};
use crate::utils::ConfigValidator;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default file name offered by the save-as action
pub const DEFAULT_DOWNLOAD_FILE_NAME: &str = "processed-image.png";

/// Message shown when no usable file was supplied
pub const DEFAULT_INVALID_INPUT_MESSAGE: &str = "No file selected";

/// Generic message shown when background removal fails
pub const DEFAULT_PROCESSING_FAILURE_MESSAGE: &str = "Error processing image";

/// Configuration for an [`ImageWorkflow`](crate::workflow::ImageWorkflow)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// File name used by `request_download`
    pub download_file_name: String,

    /// Media type recorded on result handles
    pub result_media_type: String,

    /// User-visible message for missing or non-image input
    pub invalid_input_message: String,

    /// User-visible message for any capability failure
    pub processing_failure_message: String,

    /// Start background removal as soon as a file is selected.
    /// When disabled the workflow stops in `Loaded` until `process()` is called.
    pub auto_process: bool,

    /// Probe image headers for preview dimensions
    pub probe_preview_dimensions: bool,

    /// Directory used by the filesystem download sink (None = user download dir)
    pub download_dir: Option<PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            download_file_name: DEFAULT_DOWNLOAD_FILE_NAME.to_string(),
            result_media_type: "image/png".to_string(),
            invalid_input_message: DEFAULT_INVALID_INPUT_MESSAGE.to_string(),
            processing_failure_message: DEFAULT_PROCESSING_FAILURE_MESSAGE.to_string(),
            auto_process: true,
            probe_preview_dimensions: true,
            download_dir: None,
        }
    }
}

impl WorkflowConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder::default()
    }

    /// Load configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults. The loaded configuration is
    /// validated before it is returned.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| WorkflowError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Download file name empty or containing path separators
    /// - Result media type not an `image/*` type
    /// - Empty user-visible messages
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_file_name(&self.download_file_name)?;
        ConfigValidator::validate_result_media_type(&self.result_media_type)?;
        ConfigValidator::validate_message("invalid_input_message", &self.invalid_input_message)?;
        ConfigValidator::validate_message(
            "processing_failure_message",
            &self.processing_failure_message,
        )?;
        Ok(())
    }

    /// Directory the filesystem download sink writes into
    #[must_use]
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Builder for `WorkflowConfig`
#[derive(Debug, Default)]
pub struct WorkflowConfigBuilder {
    config: WorkflowConfig,
}

impl WorkflowConfigBuilder {
    #[must_use]
    pub fn download_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.download_file_name = name.into();
        self
    }

    #[must_use]
    pub fn result_media_type<S: Into<String>>(mut self, media_type: S) -> Self {
        self.config.result_media_type = media_type.into();
        self
    }

    #[must_use]
    pub fn invalid_input_message<S: Into<String>>(mut self, message: S) -> Self {
        self.config.invalid_input_message = message.into();
        self
    }

    #[must_use]
    pub fn processing_failure_message<S: Into<String>>(mut self, message: S) -> Self {
        self.config.processing_failure_message = message.into();
        self
    }

    #[must_use]
    pub fn auto_process(mut self, enabled: bool) -> Self {
        self.config.auto_process = enabled;
        self
    }

    #[must_use]
    pub fn probe_preview_dimensions(mut self, enabled: bool) -> Self {
        self.config.probe_preview_dimensions = enabled;
        self
    }

    #[must_use]
    pub fn download_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.download_dir = Some(dir.into());
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<WorkflowConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
