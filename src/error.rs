//! Error types for the image workflow

use thiserror::Error;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Error types surfaced by the workflow and its services
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// No file supplied, or the file does not declare an image media type
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The background-removal capability rejected the image
    #[error("Processing failed: {0}")]
    ProcessingFailure(String),

    /// The requested command is not actionable in the current state
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Releasable handle errors (unknown handle, double release)
    #[error("Resource error: {0}")]
    Resource(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parsing errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new processing failure
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::ProcessingFailure(msg.into())
    }

    /// Create a new not-ready error
    pub fn not_ready<S: Into<String>>(msg: S) -> Self {
        Self::NotReady(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new resource error
    pub fn resource<S: Into<String>>(msg: S) -> Self {
        Self::Resource(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with the accepted values
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        expected: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: '{}' (expected: {})",
            parameter, value, expected
        ))
    }

    /// Whether the user can recover by selecting a file again
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::ProcessingFailure(_) | Self::NotReady(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = WorkflowError::invalid_input("No file selected");
        assert!(matches!(err, WorkflowError::InvalidInput(_)));

        let err = WorkflowError::resource("double release");
        assert!(matches!(err, WorkflowError::Resource(_)));
    }

    #[test]
    fn test_error_display() {
        let err = WorkflowError::invalid_input("No file selected");
        assert_eq!(err.to_string(), "Invalid input: No file selected");
    }

    #[test]
    fn test_contextual_errors() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = WorkflowError::file_io_error("write", Path::new("/tmp/out.png"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("write"));
        assert!(error_string.contains("/tmp/out.png"));

        let err = WorkflowError::config_value_error("download_file_name", "", "a non-empty file name");
        assert!(err.to_string().contains("download_file_name"));
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(WorkflowError::processing("boom").is_recoverable());
        assert!(WorkflowError::invalid_input("x").is_recoverable());
        assert!(!WorkflowError::internal("x").is_recoverable());
    }
}
