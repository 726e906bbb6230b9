//! Validation utilities for workflow inputs and configuration

mod config;
mod media;

pub use config::ConfigValidator;
pub use media::MediaTypeValidator;
