//! Error types for scaler operations.

use listscale_store::StoreError;
use thiserror::Error;

/// Result type alias for scaler operations.
pub type ScalerResult<T> = Result<T, ScalerError>;

/// Errors surfaced to the calling controller.
///
/// None of these are fatal: a failure for one workload leaves every
/// other registered scaler untouched.
#[derive(Debug, Error)]
pub enum ScalerError {
    /// Registration metadata was malformed or incomplete.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The workload has no registered scaler.
    #[error("Cannot find scaler {0}")]
    NotRegistered(String),

    /// The queue length query failed; the store's message is kept verbatim.
    #[error(transparent)]
    StoreQuery(#[from] StoreError),
}
