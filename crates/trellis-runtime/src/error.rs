//! Runtime error types.

use thiserror::Error;
use trellis_core::ResourceError;
use trellis_router::TemplateError;

use crate::config::ConfigError;

/// Errors that can occur while assembling a runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A route names a handler that was never registered.
    #[error("Handler not registered: {0}")]
    HandlerNotFound(String),

    /// A route template failed to parse.
    #[error("Invalid route template: {0}")]
    Template(#[from] TemplateError),

    /// A connection could not be opened.
    #[error("Failed to open connection: {0}")]
    Connection(#[from] ResourceError),

    /// The logging subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
