//! WolfRouter Error Types

use thiserror::Error;

/// Result type alias for WolfRouter operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfRouter error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Connection failed to {descriptor}: {reason}")]
    ConnectionFailed { descriptor: String, reason: String },

    #[error("Query execution failed: {0}")]
    QueryExecution(String),

    #[error("No rows in result set")]
    NoRows,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Routing errors
    #[error("Node not found: {0}")]
    NodeNotFound(usize),

    #[error("Prepared statement is closed")]
    StatementClosed,

    #[error("Connection is closed")]
    Closed,

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this error means a physical node could not be reached
    pub fn is_connectivity(&self) -> bool {
        match self {
            Error::ConnectionFailed { .. } | Error::Closed | Error::Network(_) => true,
            Error::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }

    /// Check if this error is the empty-result signal of a single-row read
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Error::NoRows | Error::Database(sqlx::Error::RowNotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        let err = Error::ConnectionFailed {
            descriptor: "replica".into(),
            reason: "refused".into(),
        };
        assert!(err.is_connectivity());
        assert!(Error::Database(sqlx::Error::PoolTimedOut).is_connectivity());
        assert!(!Error::NoRows.is_connectivity());
        assert!(!Error::QueryExecution("syntax".into()).is_connectivity());
    }

    #[test]
    fn test_no_rows() {
        assert!(Error::NoRows.is_no_rows());
        assert!(Error::Database(sqlx::Error::RowNotFound).is_no_rows());
        assert!(!Error::Closed.is_no_rows());
    }
}
