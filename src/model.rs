//! Core data types shared by the coordinator, the service client and
//! the renderer.

use serde::Serialize;
use tokio::time::Instant;

/// Dialects understood by the validation service.
///
/// The coordinator treats dialects as opaque strings; this list only
/// feeds help text and a warning for unknown names.
pub const KNOWN_DIALECTS: &[&str] = &["mysql", "postgres", "oracle", "ansi"];

/// Returns true if `dialect` is one of [`KNOWN_DIALECTS`].
pub fn is_known_dialect(dialect: &str) -> bool {
    KNOWN_DIALECTS.contains(&dialect)
}

/// A single change produced by the input source.
#[derive(Debug, Clone)]
pub struct EditEvent {
    /// Full editor contents after the change.
    pub text: String,
    /// Dialect selected at the time of the change.
    pub dialect: String,
    /// When the change happened.
    pub timestamp: Instant,
}

impl EditEvent {
    /// Create an event stamped with the current instant.
    pub fn now(text: impl Into<String>, dialect: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            dialect: dialect.into(),
            timestamp: Instant::now(),
        }
    }

    /// Empty or whitespace-only text resets the coordinator instead of
    /// triggering validation.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Identifier of a validation request, strictly increasing per coordinator.
pub type RequestId = u64;

/// A validation call issued by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    pub text: String,
    pub dialect: String,
    pub request_id: RequestId,
}

/// One finding reported by the validation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// 1-based line number; 0 when the service did not anchor the issue.
    pub line: u32,
    /// 1-based column within the line; 0 when unknown.
    pub pos: u32,
    /// Rule code (e.g. `LT01`), empty for plain syntax errors.
    pub rule: String,
    pub message: String,
}

impl Issue {
    pub fn is_anchored(&self) -> bool {
        self.line > 0
    }
}

/// A response the service produced for the submitted SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<Issue>,
    /// Auto-fixed SQL, when the service offers one.
    pub fixed_text: Option<String>,
}

/// Why a validation call produced no report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// No response reached us (connectivity, timeout).
    NetworkError,
    /// Non-2xx status or a success body we could not understand.
    ServerError,
    /// The call was aborted because a newer request superseded it.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub kind: FailureKind,
    pub detail: String,
}

/// Final outcome of a validation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationResult {
    Success(ValidationReport),
    Failure(ValidationFailure),
}

impl ValidationResult {
    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        ValidationResult::Failure(ValidationFailure {
            kind,
            detail: detail.into(),
        })
    }

    /// Outcome of a transport call aborted by a newer request.
    pub fn cancelled() -> Self {
        Self::failure(FailureKind::Cancelled, "superseded")
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ValidationResult::Failure(ValidationFailure {
                kind: FailureKind::Cancelled,
                ..
            })
        )
    }

    /// Short label used in log fields.
    pub fn label(&self) -> &'static str {
        match self {
            ValidationResult::Success(report) if report.valid => "valid",
            ValidationResult::Success(_) => "invalid",
            ValidationResult::Failure(f) => match f.kind {
                FailureKind::NetworkError => "network_error",
                FailureKind::ServerError => "server_error",
                FailureKind::Cancelled => "cancelled",
            },
        }
    }
}
