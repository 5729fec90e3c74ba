//! Error types for crewdispatch.

use thiserror::Error;

/// Result type alias using crewdispatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for crewdispatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or invalid credential
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated but lacking role, department, or level authority
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced entity absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lifecycle guard violated (e.g. job no longer queued)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed input (e.g. unknown skill level)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Notification delivery failed (swallowed by the dispatcher, surfaced
    /// only when a caller sends synchronously)
    #[error("Notification error: {0}")]
    Notification(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
