//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;
use trellis_router::{RoutingMode, TemplateError};

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file extension is not a supported or enabled format.
    #[error("Unsupported or disabled configuration file format: .{0}")]
    UnsupportedFormat(String),

    /// The merged sources could not be extracted into the schema.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },

    /// Missing required field.
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// A route template failed to parse.
    #[error("Invalid route template '{template}': {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: TemplateError,
    },

    /// Two routes share a template and mode.
    #[error("Duplicate route: {mode} '{template}'")]
    DuplicateRoute { template: String, mode: RoutingMode },
}

impl ConfigError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
