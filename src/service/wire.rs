//! Response bodies of the validation service and their normalization.
//!
//! The service has answered in two shapes over time. Both are accepted
//! and mapped onto [`ValidationReport`]; the shape is detected from the
//! keys present, not from any version marker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Issue, ValidationReport};

use super::error::ServiceError;

/// Body of `POST /validate`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateBody<'a> {
    pub sql: &'a str,
    pub dialect: &'a str,
}

/// `{ valid, errors: [ {line, pos, message} ] }`
#[derive(Debug, Deserialize)]
struct LegacyResponse {
    #[serde(default)]
    valid: Option<bool>,
    #[serde(default)]
    errors: Vec<LegacyEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyEntry {
    Detailed {
        #[serde(default)]
        line: Option<i64>,
        #[serde(default)]
        pos: Option<i64>,
        #[serde(default)]
        message: Option<String>,
    },
    Message(String),
}

/// `{ issues: [ {line, position, rule, description} ], fixed_sql }`
#[derive(Debug, Deserialize)]
struct ExtendedResponse {
    #[serde(default)]
    valid: Option<bool>,
    #[serde(default)]
    issues: Vec<ExtendedIssue>,
    #[serde(default)]
    fixed_sql: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtendedIssue {
    #[serde(default)]
    line: Option<i64>,
    #[serde(default)]
    position: Option<i64>,
    #[serde(default)]
    rule: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Normalize a 2xx response body.
pub fn normalize(body: &str) -> Result<ValidationReport, ServiceError> {
    let value: Value = serde_json::from_str(body).map_err(ServiceError::MalformedBody)?;
    let Some(object) = value.as_object() else {
        return Err(ServiceError::UnrecognizedShape);
    };

    if object.contains_key("issues") {
        let response: ExtendedResponse =
            serde_json::from_value(value).map_err(ServiceError::MalformedBody)?;
        Ok(from_extended(response))
    } else if object.contains_key("errors") {
        let response: LegacyResponse =
            serde_json::from_value(value).map_err(ServiceError::MalformedBody)?;
        Ok(from_legacy(response))
    } else {
        Err(ServiceError::UnrecognizedShape)
    }
}

/// Best-effort human readable detail from a non-2xx body.
///
/// JSON bodies contribute their `errors` messages or `error` field;
/// anything else is returned trimmed. `None` when the body says nothing.
pub fn error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_string());
    };

    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        let messages: Vec<String> = errors.iter().filter_map(entry_message).collect();
        if !messages.is_empty() {
            return Some(messages.join("; "));
        }
    }

    match value.get("error") {
        Some(Value::String(message)) => return Some(message.clone()),
        Some(Value::Object(inner)) => {
            if let Some(Value::String(message)) = inner.get("message") {
                return Some(message.clone());
            }
        }
        _ => {}
    }

    Some(trimmed.to_string())
}

fn entry_message(entry: &Value) -> Option<String> {
    match entry {
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn from_legacy(response: LegacyResponse) -> ValidationReport {
    let issues: Vec<Issue> = response
        .errors
        .into_iter()
        .map(|entry| match entry {
            LegacyEntry::Detailed { line, pos, message } => Issue {
                line: clamp(line),
                pos: clamp(pos),
                rule: String::new(),
                message: message.unwrap_or_default(),
            },
            LegacyEntry::Message(message) => Issue {
                line: 0,
                pos: 0,
                rule: String::new(),
                message,
            },
        })
        .collect();

    let valid = response.valid.unwrap_or(issues.is_empty());
    ValidationReport {
        valid,
        issues,
        fixed_text: None,
    }
}

fn from_extended(response: ExtendedResponse) -> ValidationReport {
    let issues: Vec<Issue> = response
        .issues
        .into_iter()
        .map(|issue| Issue {
            line: clamp(issue.line),
            pos: clamp(issue.position),
            rule: issue.rule.unwrap_or_default(),
            message: issue.description.unwrap_or_default(),
        })
        .collect();

    let valid = response.valid.unwrap_or(issues.is_empty());
    ValidationReport {
        valid,
        issues,
        fixed_text: response.fixed_sql.filter(|sql| !sql.is_empty()),
    }
}

fn clamp(value: Option<i64>) -> u32 {
    value
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_invalid_shape() {
        let report = normalize(
            r#"{"valid": false, "errors": [{"line": 2, "pos": 5, "message": "syntax error"}]}"#,
        )
        .unwrap();
        assert!(!report.valid);
        assert_eq!(
            report.issues,
            vec![Issue {
                line: 2,
                pos: 5,
                rule: String::new(),
                message: "syntax error".to_string(),
            }]
        );
        assert_eq!(report.fixed_text, None);
    }

    #[test]
    fn legacy_valid_shape() {
        let report = normalize(r#"{"valid": true, "errors": []}"#).unwrap();
        assert!(report.valid);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn legacy_string_errors_are_unanchored() {
        let report = normalize(r#"{"valid": false, "errors": ["No SQL provided"]}"#).unwrap();
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 1);
        assert!(!report.issues[0].is_anchored());
        assert_eq!(report.issues[0].message, "No SQL provided");
    }

    #[test]
    fn extended_shape_with_fix() {
        let report = normalize(
            r#"{
                "issues": [
                    {"line": 1, "position": 8, "rule": "LT01", "description": "Expected single space"},
                    {"line": 3, "position": 1, "rule": "CP01", "description": "Keywords must be upper case"}
                ],
                "fixed_sql": "SELECT a FROM t\n"
            }"#,
        )
        .unwrap();
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].rule, "LT01");
        assert_eq!(report.issues[0].pos, 8);
        assert_eq!(report.issues[1].message, "Keywords must be upper case");
        assert_eq!(report.fixed_text.as_deref(), Some("SELECT a FROM t\n"));
    }

    #[test]
    fn extended_shape_without_issues_is_valid() {
        let report = normalize(r#"{"issues": [], "fixed_sql": ""}"#).unwrap();
        assert!(report.valid);
        assert_eq!(report.fixed_text, None);
    }

    #[test]
    fn issues_key_wins_over_errors() {
        let report = normalize(
            r#"{"errors": [], "issues": [{"line": 4, "position": 2, "rule": "AL01", "description": "alias"}]}"#,
        )
        .unwrap();
        assert_eq!(report.issues[0].line, 4);
    }

    #[test]
    fn negative_or_missing_positions_become_zero() {
        let report = normalize(r#"{"errors": [{"line": -1, "message": "odd"}]}"#).unwrap();
        assert_eq!(report.issues[0].line, 0);
        assert_eq!(report.issues[0].pos, 0);
        assert!(!report.valid);
    }

    #[test]
    fn unknown_shape_is_rejected() {
        assert!(matches!(
            normalize(r#"{"status": "ok"}"#),
            Err(ServiceError::UnrecognizedShape)
        ));
        assert!(matches!(normalize("[1, 2]"), Err(ServiceError::UnrecognizedShape)));
        assert!(matches!(
            normalize("<html>"),
            Err(ServiceError::MalformedBody(_))
        ));
    }

    #[test]
    fn error_detail_prefers_messages() {
        assert_eq!(
            error_detail(r#"{"valid": false, "errors": ["No SQL provided"]}"#).as_deref(),
            Some("No SQL provided")
        );
        assert_eq!(
            error_detail(r#"{"error": "Internal error"}"#).as_deref(),
            Some("Internal error")
        );
        assert_eq!(error_detail("Bad Gateway\n").as_deref(), Some("Bad Gateway"));
        assert_eq!(error_detail("   "), None);
    }
}
