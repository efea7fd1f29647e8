//! # Tracking Errors
//!
//! Error taxonomy for revision-tracked writes and history navigation.
//! Store failures are normalized into these variants; callers branch on
//! `NotFound`, `Conflict` and `Integrity`.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for tracking operations
pub type TrackResult<T> = Result<T, TrackError>;

/// Tracking errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    /// Document, snapshot, edge or collection absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Key collision on create, or a lost head swap. Safe to retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Entity exists but its head pointer is gone
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Malformed input, e.g. a handle without `/`
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid tracker configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store failure outside the taxonomy above
    #[error("Store error: {0}")]
    Store(String),
}

impl TrackError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Get error code for responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "TRACK_NOT_FOUND",
            Self::Conflict(_) => "TRACK_CONFLICT",
            Self::Integrity(_) => "TRACK_INTEGRITY",
            Self::Validation(_) => "TRACK_VALIDATION",
            Self::Config(_) => "TRACK_CONFIG",
            Self::Store(_) => "TRACK_STORE",
        }
    }

    /// Only conflicts are retried, and only after re-classifying the write
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<StoreError> for TrackError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::CollectionNotFound(name) => {
                Self::NotFound(format!("collection {}", name))
            }
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::InvalidHandle(handle) => {
                Self::Validation(format!("invalid handle '{}'", handle))
            }
            StoreError::Serialization(msg) | StoreError::Internal(msg) => Self::Store(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_normalize() {
        assert!(TrackError::from(StoreError::NotFound("c/k".into())).is_not_found());
        assert!(TrackError::from(StoreError::CollectionNotFound("c".into())).is_not_found());
        assert!(TrackError::from(StoreError::Conflict("c/k".into())).is_retryable());
        assert_eq!(
            TrackError::from(StoreError::InvalidHandle("ck".into())).code(),
            "TRACK_VALIDATION"
        );
        assert_eq!(
            TrackError::from(StoreError::Internal("poisoned".into())).code(),
            "TRACK_STORE"
        );
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(TrackError::conflict("x").is_retryable());
        assert!(!TrackError::integrity("x").is_retryable());
        assert!(!TrackError::not_found("x").is_retryable());
        assert!(!TrackError::validation("x").is_retryable());
    }
}
