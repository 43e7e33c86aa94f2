//! Error types for debug-mirror.

use thiserror::Error;

/// Main error type for debug-mirror operations.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// The session facade has been closed.
    #[error("session closed: {0}")]
    SessionClosed(String),

    /// Session with the given ID was not found.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Session with the given ID is already mirrored.
    #[error("session already exists: {0}")]
    SessionExists(String),

    /// Invalid tab lifecycle transition attempted.
    #[error("invalid tab transition from {from:?} to {to:?}")]
    InvalidTabTransition {
        from: crate::session::TabState,
        to: crate::session::TabState,
    },

    /// Turning a remote snapshot into a local object failed.
    #[error("materialization failed: {0}")]
    Materialization(String),

    /// The evaluator was superseded by a newer snapshot or its session closed.
    #[error("evaluator revoked")]
    EvaluatorRevoked,

    /// The backend failed to evaluate an expression.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// The UI collaborator could not build the session tab.
    #[error("tab construction failed: {0}")]
    TabConstruction(String),

    /// The UI execution context is gone or dropped the job.
    #[error("UI context unavailable")]
    UiUnavailable,

    /// Waiting for session tasks to finish took too long.
    #[error("operation timed out")]
    Timeout,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type for debug-mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_closed_display() {
        let err = MirrorError::SessionClosed("dbg-00000001".into());
        assert!(err.to_string().contains("dbg-00000001"));
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_materialization_display() {
        let err = MirrorError::Materialization("attach refused".into());
        assert!(err.to_string().contains("materialization"));
        assert!(err.to_string().contains("attach refused"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MirrorError = io_err.into();
        assert!(matches!(err, MirrorError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: MirrorError = json_err.into();
        assert!(matches!(err, MirrorError::Json(_)));
    }

    #[test]
    fn test_config_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MirrorError = crate::config::ConfigError::Io(io_err).into();
        assert!(matches!(err, MirrorError::Config(_)));
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn test_revoked_display() {
        assert_eq!(MirrorError::EvaluatorRevoked.to_string(), "evaluator revoked");
    }
}
