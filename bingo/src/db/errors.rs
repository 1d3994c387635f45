//! Persistence error types.

use super::timeouts::TimeoutError;
use std::time::Duration;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query did not finish in time
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Row not found
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Stored value could not be interpreted
    #[error("Corrupt {entity} record {id}: {reason}")]
    Corrupt {
        entity: &'static str,
        id: i64,
        reason: String,
    },

    /// Store refused the operation (used by the in-memory store)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<TimeoutError> for StoreError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => StoreError::Timeout(duration),
            TimeoutError::Database(e) => StoreError::Database(e),
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_conversion() {
        let err: StoreError = TimeoutError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(err, StoreError::Timeout(d) if d.as_secs() == 5));
    }

    #[test]
    fn test_not_found_display() {
        let err = StoreError::NotFound {
            entity: "game",
            id: 12,
        };
        assert_eq!(err.to_string(), "game 12 not found");
    }
}
