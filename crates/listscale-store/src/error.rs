//! Error types for queue store queries.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while measuring a queue.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store address {0:?}")]
    InvalidAddress(String),

    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: ::redis::RedisError,
    },

    #[error("LLEN {queue} failed: {source}")]
    Command {
        queue: String,
        #[source]
        source: ::redis::RedisError,
    },

    #[error("store query timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Whether this failure was the query running out of time.
    pub fn is_timeout(&self) -> bool {
        match self {
            StoreError::Timeout(_) => true,
            StoreError::Connect { source, .. } | StoreError::Command { source, .. } => {
                source.is_timeout()
            }
            StoreError::InvalidAddress(_) => false,
        }
    }

    /// Whether the pooled connection that produced this error should be
    /// thrown away.
    pub(crate) fn poisons_connection(&self) -> bool {
        match self {
            StoreError::Command { source, .. } => {
                source.is_io_error() || source.is_connection_dropped() || source.is_timeout()
            }
            _ => false,
        }
    }
}
