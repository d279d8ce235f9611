//! Error types for casegraph.
//!
//! Library crates use [`CaseGraphError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Validation failures of assembled entities are *not* errors; they are
//! reported as data by the core validator.

use std::path::PathBuf;

/// Top-level error type for all casegraph operations.
#[derive(Debug, thiserror::Error)]
pub enum CaseGraphError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a CASE package.
    #[error("network error: {0}")]
    Network(String),

    /// The CASE package could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The package references data that does not exist (e.g. a dangling
    /// association endpoint).
    #[error("malformed input: {message}")]
    MalformedInput { message: String },

    /// A caller broke a function's precondition. No output can be produced.
    #[error("contract violation: {message}")]
    Contract { message: String },

    /// Invalid run options (no publisher, bad registry base, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CaseGraphError>;

impl CaseGraphError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a malformed-input error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: msg.into(),
        }
    }

    /// Create a contract-violation error from any displayable message.
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the whole run rather than a single course.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Contract { .. })
    }
}
