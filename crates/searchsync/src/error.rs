//! Error types for the sync engine
//!
//! Only enum coercion recovers in place (out-of-range indexes are logged and
//! coerced to an empty string). Every other error is fatal: the component that
//! hits it cancels the shared token and the engine shuts down, resuming from
//! the last durable position on restart.

use thiserror::Error;

/// Errors produced by the sync engine
#[derive(Error, Debug)]
pub enum SyncError {
    /// Invalid rule or table configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Row-to-document transformation failure
    #[error("transform error: {0}")]
    Transform(String),

    /// Batched index call failure
    #[error("sink error: {0}")]
    Sink(String),

    /// Position checkpoint failure
    #[error("position save error: {0}")]
    Position(String),

    /// The engine has been canceled
    #[error("sync canceled")]
    Canceled,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new transform error
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    /// Create a new sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a new position save error
    pub fn position(msg: impl Into<String>) -> Self {
        Self::Position(msg.into())
    }
}

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::transform("invalid update rows event");
        assert!(err.to_string().contains("transform error"));
        assert!(err.to_string().contains("invalid update rows event"));
    }

    #[test]
    fn test_error_constructors() {
        let _ = SyncError::config("missing column");
        let _ = SyncError::sink("bulk rejected");
        let _ = SyncError::position("store unavailable");
        assert_eq!(SyncError::Canceled.to_string(), "sync canceled");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: SyncError = io.into();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
