//! Error types for strata-ann
//!
//! A single error enum is shared by the engine and executor layers.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Validation errors (`DimensionMismatch`, `InvalidVector`, `InvalidQuery`, ...)
//! are returned before any index work is done, so a failed call leaves the
//! index unchanged. `IndexCorruption` signals a broken internal invariant and
//! is never user-recoverable.

use crate::types::EntityId;
use thiserror::Error;

/// Result type alias for strata-ann operations
pub type AnnResult<T> = std::result::Result<T, AnnError>;

/// Errors returned by index and query operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnError {
    /// Vector length disagrees with the index dimension
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension configured for the index
        expected: usize,
        /// Length of the offending vector
        got: usize,
    },

    /// Vector contains values that cannot take part in distance computation
    #[error("Invalid vector: {reason}")]
    InvalidVector {
        /// Why the vector was rejected
        reason: String,
    },

    /// Entity id is the reserved value 0
    #[error("Invalid entity id: {id}")]
    InvalidEntityId {
        /// The rejected id
        id: EntityId,
    },

    /// Entity is already indexed
    #[error("Entity already indexed: {id}")]
    DuplicateEntity {
        /// The duplicate id
        id: EntityId,
    },

    /// Entity is not indexed
    #[error("Entity not found: {id}")]
    EntityNotFound {
        /// The missing id
        id: EntityId,
    },

    /// Malformed query (two ANN conditions, k == 0, unknown attribute, ...)
    #[error("Invalid query: {reason}")]
    InvalidQuery {
        /// Why the query was rejected
        reason: String,
    },

    /// Configuration failed validation or could not be loaded
    #[error("Invalid config: {reason}")]
    InvalidConfig {
        /// Why the config was rejected
        reason: String,
    },

    /// Internal invariant violation
    #[error("Index corruption: {reason}")]
    IndexCorruption {
        /// The violated invariant
        reason: String,
    },

    /// Search was cancelled through its cancel flag
    #[error("Search cancelled")]
    Cancelled,

    /// Entity repository failed to resolve results
    #[error("Repository error: {0}")]
    Repository(String),
}

impl AnnError {
    /// Shorthand for an `InvalidQuery` error
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        AnnError::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Shorthand for an `InvalidConfig` error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        AnnError::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Shorthand for an `IndexCorruption` error
    pub fn corruption(reason: impl Into<String>) -> Self {
        AnnError::IndexCorruption {
            reason: reason.into(),
        }
    }

    /// Check if this error was caused by caller input
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            AnnError::DimensionMismatch { .. }
                | AnnError::InvalidVector { .. }
                | AnnError::InvalidEntityId { .. }
                | AnnError::DuplicateEntity { .. }
                | AnnError::InvalidQuery { .. }
                | AnnError::InvalidConfig { .. }
        )
    }

    /// Check if this error indicates a bug rather than bad input
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnnError::IndexCorruption { .. })
    }
}

/// Reject vectors whose length differs from `expected` or that contain
/// NaN / infinite components.
pub fn check_vector(expected: usize, vector: &[f32]) -> AnnResult<()> {
    if vector.len() != expected {
        return Err(AnnError::DimensionMismatch {
            expected,
            got: vector.len(),
        });
    }
    if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
        return Err(AnnError::InvalidVector {
            reason: format!("component {} is not finite", pos),
        });
    }
    Ok(())
}
