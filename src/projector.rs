//! Maps a validation result onto what a renderer shows.
//!
//! [`project`] is pure and total: any result, including odd ones such as
//! an invalid report without issues, yields a summary.

use std::collections::BTreeSet;

use crate::model::{FailureKind, Issue, ValidationResult};

const NETWORK_SUMMARY: &str =
    "Could not reach the validation service. Check that it is running and try again.";
const SERVER_SUMMARY: &str = "The validation service returned an error.";
const INVALID_WITHOUT_DETAILS: &str = "SQL is invalid, but the service gave no details.";
const VALID_SUMMARY: &str = "No issues found. SQL is valid.";

/// Coarse status of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionStatus {
    /// Nothing to show yet.
    #[default]
    Empty,
    Valid,
    Invalid,
    Failed,
}

/// Renderable view of a result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    pub status: ProjectionStatus,
    pub summary: String,
    /// Lines to highlight, 1-based.
    pub error_lines: BTreeSet<u32>,
    /// Auto-fixed SQL offered by the service.
    pub fixed_text: Option<String>,
}

/// Project the latest result.
pub fn project(last_result: Option<&ValidationResult>) -> Projection {
    match last_result {
        None => Projection::default(),
        Some(ValidationResult::Success(report)) if report.valid => Projection {
            status: ProjectionStatus::Valid,
            summary: VALID_SUMMARY.to_string(),
            error_lines: BTreeSet::new(),
            fixed_text: report.fixed_text.clone(),
        },
        Some(ValidationResult::Success(report)) => Projection {
            status: ProjectionStatus::Invalid,
            summary: invalid_summary(&report.issues),
            error_lines: report
                .issues
                .iter()
                .filter(|issue| issue.is_anchored())
                .map(|issue| issue.line)
                .collect(),
            fixed_text: report.fixed_text.clone(),
        },
        Some(ValidationResult::Failure(failure)) => match failure.kind {
            // Superseded requests are bookkeeping only.
            FailureKind::Cancelled => Projection::default(),
            FailureKind::NetworkError => failed(NETWORK_SUMMARY.to_string()),
            FailureKind::ServerError => {
                let detail = failure.detail.trim();
                if detail.is_empty() {
                    failed(SERVER_SUMMARY.to_string())
                } else {
                    failed(format!("Validation service error: {}", detail))
                }
            }
        },
    }
}

fn failed(summary: String) -> Projection {
    Projection {
        status: ProjectionStatus::Failed,
        summary,
        error_lines: BTreeSet::new(),
        fixed_text: None,
    }
}

fn invalid_summary(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return INVALID_WITHOUT_DETAILS.to_string();
    }

    let noun = if issues.len() == 1 { "issue" } else { "issues" };
    let mut summary = format!("Found {} {}:", issues.len(), noun);
    for issue in issues {
        summary.push('\n');
        summary.push_str(&describe(issue));
    }
    summary
}

/// `Line L, Pos P: RULE - message`, dropping the parts that are unknown.
fn describe(issue: &Issue) -> String {
    let message = if issue.message.trim().is_empty() {
        "(no description)"
    } else {
        issue.message.trim()
    };
    let body = if issue.rule.is_empty() {
        message.to_string()
    } else {
        format!("{} - {}", issue.rule, message)
    };

    if issue.is_anchored() {
        format!("  Line {}, Pos {}: {}", issue.line, issue.pos, body)
    } else {
        format!("  {}", body)
    }
}
