//! The validation service collaborator.
//!
//! The coordinator only sees the [`ValidationService`] trait. The HTTP
//! implementation lives in [`client`], response normalization in [`wire`].

pub mod client;
pub mod error;
pub mod wire;

use async_trait::async_trait;

use crate::model::{ValidationRequest, ValidationResult};

pub use client::HttpValidationService;
pub use error::ServiceError;

/// A backend able to validate SQL text.
///
/// Implementations never fail: every error is reported as a
/// [`ValidationResult::Failure`]. Cancellation is handled by the caller,
/// which drops the returned future when the request is superseded.
#[async_trait]
pub trait ValidationService: Send + Sync {
    /// Returns the name of this service for logging.
    fn name(&self) -> &str;

    /// Validate the request's text in its dialect.
    async fn validate(&self, request: &ValidationRequest) -> ValidationResult;
}
