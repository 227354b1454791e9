//! Error types for batch coordination.

use std::io;

use thiserror::Error;

/// Errors that can abort a coordination run.
///
/// Per-entity problems (a player that fails line resolution, a single publish
/// that errors, a duplicate or malformed worker event) are absorbed where they
/// occur and never surface as a `BatchError`. Only the inability to reach an
/// external collaborator at all aborts the run.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The entity source could not be queried at all.
    #[error("entity source unavailable: {0}")]
    EntitySource(String),

    /// The line source could not be queried at all.
    #[error("line source unavailable: {0}")]
    LineSource(String),

    /// The work queue rejected every publish attempt.
    #[error("work queue unavailable: {0}")]
    Queue(String),

    /// The reporting sink could not accept the finalized outcome.
    #[error("report sink failed: {0}")]
    Report(String),

    /// Settings file or environment overrides could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for batch coordination operations.
pub type BatchResult<T> = Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_source_error_display() {
        let err = BatchError::EntitySource("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "entity source unavailable: connection refused"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: BatchError = io_err.into();
        assert!(matches!(err, BatchError::Io(_)));
    }

    #[test]
    fn test_json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: BatchError = json_err.into();
        assert!(matches!(err, BatchError::Json(_)));
    }
}
