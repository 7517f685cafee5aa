use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::timeout;

use crate::config::ServiceConfig;
use crate::model::{ValidationReport, ValidationRequest, ValidationResult};

use super::error::ServiceError;
use super::wire::{error_detail, normalize, ValidateBody};
use super::ValidationService;

/// Validation service reached over HTTP (`POST {base_url}/validate`).
pub struct HttpValidationService {
    client: Client,
    endpoint: String,
    request_timeout: Duration,
}

impl HttpValidationService {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds.into()))
            .build()
            .map_err(ServiceError::Build)?;

        Ok(Self {
            client,
            endpoint: format!("{}/validate", config.base_url.trim_end_matches('/')),
            request_timeout: Duration::from_secs(config.timeout_seconds.into()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one request and normalize the answer.
    pub async fn call(&self, request: &ValidationRequest) -> Result<ValidationReport, ServiceError> {
        let result = timeout(self.request_timeout, self.do_call(request)).await;

        match result {
            Ok(report) => report,
            Err(_) => Err(ServiceError::Timeout {
                duration: self.request_timeout.as_secs(),
            }),
        }
    }

    async fn do_call(&self, request: &ValidationRequest) -> Result<ValidationReport, ServiceError> {
        tracing::debug!(
            url = %self.endpoint,
            request_id = request.request_id,
            dialect = %request.dialect,
            bytes = request.text.len(),
            "Sending validation request"
        );

        let body = ValidateBody {
            sql: &request.text,
            dialect: &request.dialect,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::ConnectionError {
                url: self.endpoint.clone(),
                source: e,
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = error_detail(&error_text).unwrap_or_else(|| {
                format!(
                    "{} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown status")
                )
            });

            return Err(ServiceError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let text = response.text().await.map_err(ServiceError::Body)?;
        normalize(&text)
    }
}

#[async_trait]
impl ValidationService for HttpValidationService {
    fn name(&self) -> &str {
        "http"
    }

    async fn validate(&self, request: &ValidationRequest) -> ValidationResult {
        match self.call(request).await {
            Ok(report) => {
                tracing::debug!(
                    request_id = request.request_id,
                    valid = report.valid,
                    issues = report.issues.len(),
                    "Validation response received"
                );
                ValidationResult::Success(report)
            }
            Err(err) => {
                tracing::warn!(
                    request_id = request.request_id,
                    error_type = err.error_type(),
                    error = %err,
                    "Validation request failed"
                );
                err.into()
            }
        }
    }
}
