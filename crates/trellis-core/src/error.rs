//! Unified error types for Trellis.
//!
//! Every dispatch operation resolves its [`Promise`](crate::Promise) with either
//! a success payload or exactly one [`ResourceError`]. Errors are values, never
//! panics: a panic is reserved for broken programming contracts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::ResourcePath;

/// The kind of a [`ResourceError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The request was malformed or semantically invalid.
    BadRequest,
    /// The caller is not permitted to perform the operation.
    Forbidden,
    /// No route or resource matched.
    NotFound,
    /// A precondition (usually a revision) did not hold.
    Conflict,
    /// The target does not implement the operation.
    NotSupported,
    /// A configuration defect or an unexpected provider fault.
    Internal,
}

impl ErrorKind {
    /// Returns the stable numeric code for this kind.
    pub fn code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
            Self::NotSupported => 501,
        }
    }
}

/// Errors produced while routing or handling a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Malformed or semantically invalid request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The operation is not permitted.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Nothing matched the request.
    #[error("not found: {message}")]
    NotFound {
        /// Human readable reason.
        message: String,
        /// The resource path that could not be resolved, when known.
        path: Option<ResourcePath>,
    },

    /// Precondition or version mismatch.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The operation is not implemented by the target.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Configuration defect or unexpected fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResourceError {
    /// Creates a bad request error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Creates a forbidden error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Creates a not-found error that is not tied to a specific path.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
            path: None,
        }
    }

    /// Creates the not-found error reported when no route matches `path`.
    pub fn resource_not_found(path: &ResourcePath) -> Self {
        Self::NotFound {
            message: format!("Resource '{path}' not found"),
            path: Some(path.clone()),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Creates a not-supported error.
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// Creates an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotSupported(_) => ErrorKind::NotSupported,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the numeric code of this error.
    pub fn code(&self) -> u16 {
        self.kind().code()
    }

    /// Returns the unmatched path carried by a routing not-found error.
    pub fn unmatched_path(&self) -> Option<&ResourcePath> {
        match self {
            Self::NotFound { path, .. } => path.as_ref(),
            _ => None,
        }
    }
}

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
