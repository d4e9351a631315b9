//! Error types for query evaluation.

use thiserror::Error;

/// Result type alias using [`ReqlError`].
pub type Result<T> = std::result::Result<T, ReqlError>;

/// Error types raised while evaluating a query.
///
/// Every variant propagates unchanged through the evaluator and the runner;
/// only `default` intercepts [`ReqlError::NonExistence`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReqlError {
    /// Malformed query shape (unknown index, bad operand arity, ...).
    #[error("Compile error: {0}")]
    Compile(String),

    /// Type mismatches, explicit `error` nodes, nested literals, missing tables.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Field or element access on a value that lacks it.
    #[error("Non-existence error: {0}")]
    NonExistence(String),

    /// Variable lookup that missed every frame of the scope chain.
    #[error("Symbol not defined: {0}")]
    NameNotBound(String),
}

/// Coarse classification mirroring the server's error hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Compile,
    Runtime,
    NonExistence,
}

impl ReqlError {
    /// Builds a runtime error from anything displayable.
    pub fn runtime(msg: impl Into<String>) -> Self {
        ReqlError::Runtime(msg.into())
    }

    /// Builds a compile error from anything displayable.
    pub fn compile(msg: impl Into<String>) -> Self {
        ReqlError::Compile(msg.into())
    }

    /// Builds a non-existence error from anything displayable.
    pub fn non_existence(msg: impl Into<String>) -> Self {
        ReqlError::NonExistence(msg.into())
    }

    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReqlError::Compile(_) | ReqlError::NameNotBound(_) => ErrorKind::Compile,
            ReqlError::Runtime(_) => ErrorKind::Runtime,
            ReqlError::NonExistence(_) => ErrorKind::NonExistence,
        }
    }

    /// Returns true for runtime errors, including non-existence errors
    /// (which the server reports as a runtime subtype).
    #[must_use]
    pub fn is_runtime(&self) -> bool {
        matches!(self.kind(), ErrorKind::Runtime | ErrorKind::NonExistence)
    }

    /// Returns the bare message without the category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ReqlError::Compile(m)
            | ReqlError::Runtime(m)
            | ReqlError::NonExistence(m)
            | ReqlError::NameNotBound(m) => m,
        }
    }
}

impl From<serde_json::Error> for ReqlError {
    fn from(value: serde_json::Error) -> Self {
        ReqlError::Runtime(format!("Failed to parse JSON: {value}"))
    }
}
