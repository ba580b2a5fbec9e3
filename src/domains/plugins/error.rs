//! Plugin error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::error::ErrorKind;

/// Errors raised while loading, unloading or invoking capability providers.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A required field was blank or missing.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A plugin with this id is loaded or being loaded.
    #[error("Plugin already loaded: {0}")]
    Conflict(String),

    /// No plugin is loaded under this id.
    #[error("Plugin not found: {0}")]
    NotFound(String),

    /// The provider does not offer the requested operation.
    #[error("'{declaring_type}' has no operation '{operation}'")]
    UnknownOperation {
        declaring_type: String,
        operation: String,
    },

    /// The bundle is missing, unreadable, corrupt or not acceptable.
    #[error("Cannot load bundle '{path}': {reason}")]
    Load { path: PathBuf, reason: String },

    /// Writing or removing a bundle file failed.
    #[error("I/O error for bundle '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A bounded storage operation did not finish in time.
    #[error("Timed out while {action} '{path}'")]
    Timeout { action: &'static str, path: PathBuf },

    /// Plugin code trapped, ran out of fuel, or returned a failure code.
    #[error("Invocation of '{declaring_type}.{operation}' failed: {reason}")]
    Invocation {
        declaring_type: String,
        operation: String,
        reason: String,
    },

    /// The owning plugin was unloaded; the call may be retried once the
    /// capability is registered again.
    #[error("Plugin '{0}' has been unloaded")]
    Disposed(String),

    /// The provider rejected the call with an error of its own.
    #[error("Operation '{operation}' failed: {message}")]
    Rejected {
        operation: String,
        kind: ErrorKind,
        message: String,
    },

    /// Engine or runtime failure that should not happen under normal
    /// operation.
    #[error("Internal plugin error: {0}")]
    Internal(String),
}

impl PluginError {
    /// Create a new "invalid input" error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new "conflict" error.
    pub fn conflict(id: impl Into<String>) -> Self {
        Self::Conflict(id.into())
    }

    /// Create a new "not found" error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a new "unknown operation" error.
    pub fn unknown_operation(declaring_type: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnknownOperation {
            declaring_type: declaring_type.into(),
            operation: operation.into(),
        }
    }

    /// Create a new load error for `path`.
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a new invocation error.
    pub fn invocation(
        declaring_type: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invocation {
            declaring_type: declaring_type.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error a provider raised while handling `operation`.
    pub fn rejected(operation: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) | Self::UnknownOperation { .. } => ErrorKind::NotFound,
            Self::Load { .. } => ErrorKind::LoadError,
            Self::Io { .. } | Self::Timeout { .. } => ErrorKind::IoError,
            Self::Disposed(_) => ErrorKind::Unavailable,
            Self::Rejected { kind, .. } => *kind,
            Self::Invocation { .. } | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unavailable | ErrorKind::IoError)
    }
}
