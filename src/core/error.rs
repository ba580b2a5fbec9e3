//! Error types and handling for the MCP server.
//!
//! This module defines a unified error type that can represent errors from
//! all domains and external dependencies, plus the [`ErrorKind`] taxonomy
//! every domain error maps onto so that callers can decide whether to retry,
//! rename, or give up.

use serde::Serialize;
use thiserror::Error;

/// A specialized Result type for MCP server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification shared by every domain error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required field was blank or missing.
    InvalidInput,
    /// A unique key already exists on a create-only path.
    Conflict,
    /// The addressed tool, plugin, or operation does not exist.
    NotFound,
    /// The operation does not apply to the target's configuration.
    Unsupported,
    /// An expression failed to parse or evaluate.
    EvaluationError,
    /// A bundle is missing, corrupt, or not acceptable.
    LoadError,
    /// Storage transfer or cleanup failed.
    IoError,
    /// The target was torn down while the call was being made; retryable.
    Unavailable,
    /// Anything that should not happen under normal operation.
    Internal,
}

impl ErrorKind {
    /// Stable identifier used in wire-level error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
            Self::EvaluationError => "evaluation_error",
            Self::LoadError => "load_error",
            Self::IoError => "io_error",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the MCP server.
///
/// This enum captures all possible error conditions that can occur during
/// server operation, including domain-specific errors and external failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Error originating from the tools domain.
    #[error("Tool error: {0}")]
    Tool(#[from] crate::domains::tools::ToolError),

    /// Error originating from the expression tools domain.
    #[error("Expression tool error: {0}")]
    Expression(#[from] crate::domains::expressions::ExpressionError),

    /// Error originating from the plugins domain.
    #[error("Plugin error: {0}")]
    Plugin(#[from] crate::domains::plugins::PluginError),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors from file operations or network communication.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors that should not occur under normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Tool(e) => e.kind(),
            Self::Expression(e) => e.kind(),
            Self::Plugin(e) => e.kind(),
            Self::Config(_) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::IoError,
            Self::Json(_) => ErrorKind::InvalidInput,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::expressions::ExpressionError;
    use crate::domains::plugins::PluginError;

    #[test]
    fn test_kind_passes_through_domain_errors() {
        let err: Error = ExpressionError::conflict("mul").into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: Error = PluginError::not_found("greeter-1234").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::EvaluationError).unwrap();
        assert_eq!(json, "\"evaluation_error\"");
        assert_eq!(ErrorKind::LoadError.to_string(), "load_error");
    }

    #[test]
    fn test_io_error_is_io_kind() {
        let err: Error = std::io::Error::other("disk gone").into();
        assert_eq!(err.kind(), ErrorKind::IoError);
    }
}
