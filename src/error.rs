//! Error types for grammar compilation and connection management.

use thiserror::Error;

/// Errors raised by the SQLite dialect.
#[derive(Debug, Error)]
pub enum DialectError {
    /// Invalid or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Opening or configuring an engine connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Statement execution failed; carries the engine's message.
    #[error("query error: {0}")]
    Query(String),

    /// No connection became available within the acquire timeout.
    #[error("timed out after {waited_ms}ms waiting for a pooled connection")]
    PoolTimeout { waited_ms: u64 },

    /// The pool was shut down.
    #[error("connection pool is closed")]
    PoolClosed,

    /// The dialect cannot express the requested operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A blocking worker or internal lock failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for DialectError {
    fn from(err: rusqlite::Error) -> Self {
        DialectError::Query(err.to_string())
    }
}

/// Convenience alias for results with [`DialectError`].
pub type Result<T> = std::result::Result<T, DialectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DialectError::PoolTimeout { waited_ms: 250 };
        assert_eq!(
            err.to_string(),
            "timed out after 250ms waiting for a pooled connection"
        );

        let err = DialectError::UnsupportedOperation("drop column".to_string());
        assert!(err.to_string().contains("drop column"));
    }

    #[test]
    fn test_from_rusqlite() {
        let err: DialectError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, DialectError::Query(_)));
    }
}
