//! Core error types.

use std::io;
use thiserror::Error;

use crate::entry::Action;

/// Error type for traversal, content, and plugin operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Path resolution reached a missing segment.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// The target entry does not support the requested action.
    #[error("entry {path} does not support {action}")]
    UnsupportedAction {
        /// Entry path the action was attempted on.
        path: String,
        /// The unsupported action.
        action: Action,
    },

    /// A plugin backend call failed. Never cached.
    #[error("backend failure: {0}")]
    Backend(String),

    /// The operation was aborted by its context.
    #[error("operation cancelled")]
    Cancelled,

    /// A plugin broke an entry/schema contract. Fatal to the containing
    /// request; identifies the offending type-id.
    #[error("invariant violation in {type_id}: {msg}")]
    InvariantViolation {
        /// Type-id of the entry or schema that broke the contract.
        type_id: String,
        /// What was violated.
        msg: String,
    },

    /// Content stream errored after priming.
    #[error("stream error: {0}")]
    Stream(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors fan out to every waiter joined on a single-flight cache fetch,
/// so they must be duplicable. `io::Error` is rebuilt from kind + message.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Self::NotFound(p) => Self::NotFound(p.clone()),
            Self::UnsupportedAction { path, action } => Self::UnsupportedAction {
                path: path.clone(),
                action: *action,
            },
            Self::Backend(msg) => Self::Backend(msg.clone()),
            Self::Cancelled => Self::Cancelled,
            Self::InvariantViolation { type_id, msg } => Self::InvariantViolation {
                type_id: type_id.clone(),
                msg: msg.clone(),
            },
            Self::Stream(msg) => Self::Stream(msg.clone()),
            Self::Io(e) => Self::Io(io::Error::new(e.kind(), e.to_string())),
        }
    }
}

impl Error {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an UnsupportedAction error.
    pub fn unsupported(path: impl Into<String>, action: Action) -> Self {
        Self::UnsupportedAction {
            path: path.into(),
            action,
        }
    }

    /// Create a Backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create an InvariantViolation error.
    pub fn invariant(type_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvariantViolation {
            type_id: type_id.into(),
            msg: msg.into(),
        }
    }

    /// Create a Stream error.
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }

    /// True if this error was caused by context cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Convert to std::io::Error for filesystem-adapter consumers.
impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            Error::UnsupportedAction { .. } => {
                io::Error::new(io::ErrorKind::Unsupported, e.to_string())
            }
            Error::Cancelled => io::Error::new(io::ErrorKind::Interrupted, "cancelled"),
            Error::Io(e) => e,
            other => io::Error::other(other.to_string()),
        }
    }
}

/// Core result type.
pub type Result<T> = std::result::Result<T, Error>;
