// src/error.rs - Engine error taxonomy and the tagged outcome returned by every public operation
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("no {field} column could be identified on table {table}")]
    SchemaGap { table: String, field: &'static str },
    #[error("ambiguous consolidation: {0}")]
    AmbiguousConsolidation(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("collaborator error: {0}")]
    Collaborator(String),
    #[error("no records supplied for {0}")]
    EmptyInput(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    /// Wraps a database failure, keeping the whole context chain in the message.
    pub fn query(err: anyhow::Error) -> Self {
        EngineError::Query(format!("{:#}", err))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "config",
            EngineError::SchemaGap { .. } => "schema_gap",
            EngineError::AmbiguousConsolidation(_) => "ambiguous_consolidation",
            EngineError::Query(_) => "query",
            EngineError::Collaborator(_) => "collaborator",
            EngineError::EmptyInput(_) => "empty_input",
            EngineError::InvalidInput(_) => "invalid_input",
        }
    }
}

/// Result envelope for engine operations. Callers match on it instead of
/// catching errors; only startup configuration failures escape as `Err`.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Error(EngineError),
    ManualReviewRequired(String),
}

impl<T> Outcome<T> {
    /// `success` or `error`; manual review is reported as an error status.
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Error(_) | Outcome::ManualReviewRequired(_) => "error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn requires_manual_review(&self) -> bool {
        matches!(self, Outcome::ManualReviewRequired(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Error(e) => Some(e.to_string()),
            Outcome::ManualReviewRequired(detail) => Some(detail.clone()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::ManualReviewRequired(detail) => Outcome::ManualReviewRequired(detail),
        }
    }
}

impl<T: Serialize> Outcome<T> {
    /// Renders the `{status, ...}` envelope, placing a successful value under `key`.
    pub fn to_response(&self, key: &str) -> Value {
        match self {
            Outcome::Success(value) => {
                let mut body = serde_json::Map::new();
                body.insert("status".to_string(), json!("success"));
                body.insert(
                    key.to_string(),
                    serde_json::to_value(value).unwrap_or(Value::Null),
                );
                Value::Object(body)
            }
            Outcome::Error(e) => json!({
                "status": "error",
                "error": e.to_string(),
                "error_kind": e.kind(),
                "requires_manual_review": false,
            }),
            Outcome::ManualReviewRequired(detail) => json!({
                "status": "error",
                "error": detail,
                "error_kind": "ambiguous_consolidation",
                "requires_manual_review": true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_review_reports_error_status() {
        let outcome: Outcome<u32> = Outcome::ManualReviewRequired("two active customers".into());
        assert_eq!(outcome.status(), "error");
        assert!(outcome.requires_manual_review());

        let response = outcome.to_response("consolidated_record");
        assert_eq!(response["status"], "error");
        assert_eq!(response["requires_manual_review"], true);
        assert!(response.get("consolidated_record").is_none());
    }

    #[test]
    fn test_plain_error_is_not_manual_review() {
        let outcome: Outcome<u32> = Outcome::Error(EngineError::EmptyInput("consolidation"));
        assert_eq!(outcome.status(), "error");
        assert!(!outcome.requires_manual_review());
        let response = outcome.to_response("value");
        assert_eq!(response["error_kind"], "empty_input");
        assert_eq!(response["requires_manual_review"], false);
    }

    #[test]
    fn test_success_envelope_and_map() {
        let outcome = Outcome::Success(2.5_f64).map(|h| h * 2.0);
        let response = outcome.to_response("hours_saved");
        assert_eq!(response["status"], "success");
        assert_eq!(response["hours_saved"], 5.0);
    }

    #[test]
    fn test_query_error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection reset").context("Failed to insert update record");
        let engine_err = EngineError::query(err);
        let message = engine_err.to_string();
        assert!(message.contains("Failed to insert update record"));
        assert!(message.contains("connection reset"));
    }
}
