//! Expression tool error types.

use thiserror::Error;

use super::language::EvalError;
use crate::core::error::ErrorKind;

/// Errors raised by the expression tool store and executor.
#[derive(Debug, Error)]
pub enum ExpressionError {
    /// A required field was blank or missing.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// `add` was called with a name that is already taken.
    #[error("Expression tool already exists: {0}")]
    Conflict(String),

    /// No tool is stored under this name.
    #[error("Expression tool not found: {0}")]
    NotFound(String),

    /// The tool exists but has nothing the executor can run.
    #[error("Expression tool '{0}' has no expression to evaluate")]
    Unsupported(String),

    /// Parsing or evaluating the tool's expression failed.
    #[error("Evaluation of expression tool '{tool}' failed: {source}")]
    Evaluation {
        tool: String,
        #[source]
        source: EvalError,
    },
}

impl ExpressionError {
    /// Create a new "invalid input" error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new "conflict" error.
    pub fn conflict(name: impl Into<String>) -> Self {
        Self::Conflict(name.into())
    }

    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "unsupported" error.
    pub fn unsupported(name: impl Into<String>) -> Self {
        Self::Unsupported(name.into())
    }

    /// Wrap an evaluation failure for `tool`.
    pub fn evaluation(tool: impl Into<String>, source: EvalError) -> Self {
        Self::Evaluation {
            tool: tool.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Evaluation { .. } => ErrorKind::EvaluationError,
        }
    }
}
