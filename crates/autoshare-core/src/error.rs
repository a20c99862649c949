//! Error types for autoshare
//!
//! This module defines all error types used throughout the workspace.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for autoshare operations
pub type Result<T> = std::result::Result<T, Error>;

/// A structured error entry returned by a DNS provider API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorEntry {
    /// Provider-specific error code (0 when the provider did not send one)
    #[serde(default)]
    pub code: i64,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

impl ApiErrorEntry {
    /// Create a new error entry
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Decode an entry leniently from an arbitrary JSON value.
    ///
    /// Providers are not consistent about the shape of their error list, so
    /// anything that is not an object with `code`/`message` keeps its raw
    /// JSON text as the message.
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Self {
                code: map.get("code").and_then(serde_json::Value::as_i64).unwrap_or(0),
                message: map
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string()),
            },
            serde_json::Value::String(s) => Self::new(0, s.clone()),
            other => Self::new(0, other.to_string()),
        }
    }
}

impl std::fmt::Display for ApiErrorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Code {}: {}", self.code, self.message)
    }
}

/// Core error type for autoshare
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed local input, always raised before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// DNS provider returned a transport failure, bad status, bad body or `success: false`
    #[error("DNS provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
        /// Structured error entries sent back by the provider
        errors: Vec<ApiErrorEntry>,
    },

    /// Lifecycle misuse (e.g. starting a server twice)
    #[error("Usage error: {0}")]
    Usage(String),

    /// File server failures (bind, accept loop)
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a provider error without structured entries
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Create a provider error carrying the provider's structured entries
    pub fn provider_with_errors(
        provider: impl Into<String>,
        message: impl Into<String>,
        errors: Vec<ApiErrorEntry>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            errors,
        }
    }

    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a server error
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// Structured provider entries, empty for every other kind
    pub fn provider_errors(&self) -> &[ApiErrorEntry] {
        match self {
            Self::Provider { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Whether this error was raised locally before any network call
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Render the error for an operator, listing any provider entries.
    pub fn details(&self) -> String {
        let mut out = self.to_string();
        let entries = self.provider_errors();
        if !entries.is_empty() {
            out.push_str("\nDetails:");
            for entry in entries {
                out.push_str("\n- ");
                out.push_str(&entry.to_string());
            }
        }
        out
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_from_object() {
        let value = serde_json::json!({"code": 1000, "message": "bad"});
        assert_eq!(ApiErrorEntry::from_value(&value), ApiErrorEntry::new(1000, "bad"));
    }

    #[test]
    fn entry_from_non_object_keeps_raw_text() {
        let value = serde_json::json!("zone locked");
        assert_eq!(ApiErrorEntry::from_value(&value), ApiErrorEntry::new(0, "zone locked"));

        let value = serde_json::json!(42);
        assert_eq!(ApiErrorEntry::from_value(&value).message, "42");
    }

    #[test]
    fn details_lists_provider_entries() {
        let err = Error::provider_with_errors(
            "cloudflare",
            "400 Bad Request",
            vec![ApiErrorEntry::new(1000, "bad"), ApiErrorEntry::new(9005, "nope")],
        );

        let details = err.details();
        assert!(details.contains("400 Bad Request"));
        assert!(details.contains("- Code 1000: bad"));
        assert!(details.contains("- Code 9005: nope"));
    }

    #[test]
    fn details_without_entries_is_display() {
        let err = Error::validation("ttl must be 1");
        assert_eq!(err.details(), err.to_string());
        assert!(err.is_validation());
        assert!(err.provider_errors().is_empty());
    }
}
