//! Error classification for validation service calls.
//!
//! These errors never leave the service layer as `Err`: each one is
//! mapped onto a [`ValidationResult::Failure`] before it reaches the
//! coordinator.

use thiserror::Error;

use crate::model::{FailureKind, ValidationResult};

/// Errors that can occur while calling the validation service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Failed to connect or the connection broke before a response.
    #[error("Could not reach validation service at '{url}': {source}")]
    ConnectionError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request exceeded the configured timeout
    #[error("Validation request timed out after {duration}s")]
    Timeout { duration: u64 },

    /// Service answered with a non-2xx status
    #[error("{detail}")]
    Status { status: u16, detail: String },

    /// 2xx body that is not JSON or does not match the expected fields
    #[error("Malformed response from validation service: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// 2xx JSON body that matches neither known response shape
    #[error("Unrecognized response shape from validation service")]
    UnrecognizedShape,

    /// Failed to read the response body
    #[error("Failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl ServiceError {
    /// Failure category shown to the coordinator.
    pub fn kind(&self) -> FailureKind {
        match self {
            ServiceError::ConnectionError { .. } => FailureKind::NetworkError,
            ServiceError::Timeout { .. } => FailureKind::NetworkError,
            ServiceError::Body(_) => FailureKind::NetworkError,
            ServiceError::Build(_) => FailureKind::NetworkError,
            ServiceError::Status { .. } => FailureKind::ServerError,
            ServiceError::MalformedBody(_) => FailureKind::ServerError,
            ServiceError::UnrecognizedShape => FailureKind::ServerError,
        }
    }

    /// Get error type string for log fields
    pub fn error_type(&self) -> &'static str {
        match self {
            ServiceError::ConnectionError { .. } => "connection_error",
            ServiceError::Timeout { .. } => "timeout",
            ServiceError::Status { .. } => "status",
            ServiceError::MalformedBody(_) => "malformed_body",
            ServiceError::UnrecognizedShape => "unrecognized_shape",
            ServiceError::Body(_) => "body_error",
            ServiceError::Build(_) => "client_build",
        }
    }
}

impl From<ServiceError> for ValidationResult {
    fn from(err: ServiceError) -> Self {
        ValidationResult::failure(err.kind(), err.to_string())
    }
}
