//! Error types for the stageresume crate.
//!
//! Three classes of failure surface from the retry core:
//! invalid requests (user-facing, never retried), invalid state (prior-run
//! data is inconsistent) and collaborator failures. A structural mismatch
//! between pipeline definitions is a normal `false` result, not an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Convenience result alias for stageresume operations.
pub type RetryResult<T> = Result<T, RetryError>;

/// The main error type for retry operations.
#[derive(Debug, Error)]
pub enum RetryError {
    /// The retry request cannot be served as asked.
    #[error("{0}")]
    InvalidRequest(#[from] InvalidRequestError),

    /// Data recorded by a previous run is inconsistent.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A pipeline document could not be parsed or has an unexpected layout.
    #[error("{0}")]
    Document(#[from] DocumentError),

    /// An external collaborator failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl RetryError {
    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(InvalidRequestError::new(message))
    }

    /// Creates an invalid state error.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Creates a store error.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Returns true if the error should be reported to the user as a bad request.
    #[must_use]
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }

    /// Returns true if the error indicates inconsistent prior-run data.
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = match self {
            Self::InvalidRequest(err) => {
                let mut map = err.to_dict();
                map.insert("type".to_string(), serde_json::json!("InvalidRequest"));
                map
            }
            Self::InvalidState(_) => {
                HashMap::from([("type".to_string(), serde_json::json!("InvalidState"))])
            }
            Self::Document(_) => {
                HashMap::from([("type".to_string(), serde_json::json!("InvalidDocument"))])
            }
            Self::Store(_) => {
                HashMap::from([("type".to_string(), serde_json::json!("StoreFailure"))])
            }
            Self::Config(_) => {
                HashMap::from([("type".to_string(), serde_json::json!("InvalidConfig"))])
            }
        };
        map.entry("message".to_string())
            .or_insert_with(|| serde_json::json!(self.to_string()));
        map
    }
}

/// Error raised when a retry request is malformed or refers to unknown stages.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct InvalidRequestError {
    /// The error message.
    pub message: String,
    /// Stage identifiers involved in the error.
    #[serde(default)]
    pub stages: Vec<String>,
}

impl InvalidRequestError {
    /// Creates a new invalid request error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::Value::String(self.message.clone()));
        map.insert(
            "stages".to_string(),
            serde_json::Value::Array(
                self.stages
                    .iter()
                    .map(|s| serde_json::Value::String(s.clone()))
                    .collect(),
            ),
        );
        map
    }
}

/// Errors raised while reading pipeline documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document text was empty.
    #[error("Pipeline document is empty")]
    Empty,

    /// The document text is not valid YAML.
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document could not be rendered as JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document does not have the expected stage layout.
    #[error("Unexpected document layout at '{path}': {message}")]
    Layout {
        /// Path of the offending element.
        path: String,
        /// What was wrong with it.
        message: String,
    },
}

impl DocumentError {
    /// Creates a layout error.
    #[must_use]
    pub fn layout(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Layout {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid YAML.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A config value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_error_to_dict() {
        let err = InvalidRequestError::new("Unknown stage")
            .with_stages(vec!["stage1".to_string()]);

        let dict = err.to_dict();
        assert_eq!(dict.get("message").unwrap(), "Unknown stage");
        assert_eq!(dict.get("stages").unwrap(), &serde_json::json!(["stage1"]));
    }

    #[test]
    fn test_retry_error_classes() {
        assert!(RetryError::invalid_request("bad").is_invalid_request());
        assert!(RetryError::invalid_state("broken").is_invalid_state());
        assert!(!RetryError::store("down").is_invalid_request());
    }

    #[test]
    fn test_retry_error_to_dict() {
        let dict = RetryError::invalid_state("no node execution for uuid1").to_dict();
        assert_eq!(dict.get("type").unwrap(), "InvalidState");
        assert_eq!(
            dict.get("message").unwrap(),
            "Invalid state: no node execution for uuid1"
        );

        let dict = RetryError::invalid_request("bad").to_dict();
        assert_eq!(dict.get("type").unwrap(), "InvalidRequest");
        assert_eq!(dict.get("message").unwrap(), "bad");
    }

    #[test]
    fn test_document_layout_error_display() {
        let err = DocumentError::layout("pipeline.stages[1]", "expected a stage");
        assert_eq!(
            err.to_string(),
            "Unexpected document layout at 'pipeline.stages[1]': expected a stage"
        );
    }
}
