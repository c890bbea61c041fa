//! Common error types for the check service.

use std::fmt;

/// A specialized Result type for check service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for store, API and bootstrap operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("The check with id '{0}' does not exist")]
    NotFound(String),

    #[error("The maximum number of checks ({0}) has been reached")]
    Capacity(usize),

    #[error("A check with id '{0}' already exists")]
    DuplicateId(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new validation error.
    pub fn validation(msg: impl fmt::Display) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new not-found error for the given id.
    pub fn not_found(id: impl fmt::Display) -> Self {
        Error::NotFound(id.to_string())
    }

    /// Create a new persistence error.
    pub fn persistence(msg: impl fmt::Display) -> Self {
        Error::Persistence(msg.to_string())
    }

    /// Create a new other error.
    pub fn other(msg: impl fmt::Display) -> Self {
        Error::Other(msg.to_string())
    }
}

/// Symbolic code recorded for a probe that ran out of time.
pub const TIMEOUT_CODE: &str = "ETIMEDOUT";

/// Transport failure of a single probe. Timeouts are not transport
/// failures; they are settled by the probe run itself.
///
/// Never escapes the probe that produced it: it is folded into the check's
/// `err_code` field instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("transport error {code}: {message}")]
    Transport { code: String, message: String },
}

impl ProbeError {
    /// Create a transport error with a symbolic code.
    pub fn transport(code: impl Into<String>, message: impl fmt::Display) -> Self {
        ProbeError::Transport {
            code: code.into(),
            message: message.to_string(),
        }
    }

    /// The symbolic code stored in `err_code`.
    pub fn err_code(&self) -> &str {
        match self {
            ProbeError::Transport { code, .. } => code,
        }
    }
}
