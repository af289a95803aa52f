//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for ActionArc
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ActionArcError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Non-success response from a remote REST API.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Process error: {0}")]
    Process(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionArcError {
    /// Stable label suitable for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::Security(_) => "security",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Api { .. } => "api",
            Self::Process(_) => "process",
            Self::Internal(_) => "internal",
        }
    }

    /// True when this is an API error carrying the given HTTP status.
    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, Self::Api { status, .. } if *status == code)
    }
}

/// Result type alias for ActionArc operations
pub type Result<T> = std::result::Result<T, ActionArcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_reports_status() {
        let err = ActionArcError::Api { status: 410, message: "gone".into() };
        assert!(err.is_status(410));
        assert!(!err.is_status(404));
        assert_eq!(err.label(), "api");
        assert_eq!(err.to_string(), "API error (410): gone");
    }

    #[test]
    fn serializes_with_type_tag() {
        let err = ActionArcError::NotFound("event".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "NotFound");
        assert_eq!(json["message"], "event");
    }
}
