//! # Store Errors
//!
//! Error types reported by a document/graph store.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Document or edge does not exist
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Collection does not exist
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Key collision on create, revision mismatch on conditional write,
    /// or a swapped-out edge that is already gone
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Handle is not of the form `collection/key`
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Body could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal store failure (poisoned lock, I/O)
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns the numeric error code the way document stores report them
    pub fn error_num(&self) -> u16 {
        match self {
            StoreError::NotFound(_) => 1202,
            StoreError::CollectionNotFound(_) => 1203,
            StoreError::Conflict(_) => 1210,
            StoreError::InvalidHandle(_) => 1205,
            StoreError::Serialization(_) => 600,
            StoreError::Internal(_) => 4,
        }
    }

    /// True for both flavours of "absent"
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::CollectionNotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_nums() {
        assert_eq!(StoreError::NotFound("x".into()).error_num(), 1202);
        assert_eq!(StoreError::CollectionNotFound("x".into()).error_num(), 1203);
    }

    #[test]
    fn test_not_found_covers_collections() {
        assert!(StoreError::NotFound("a/b".into()).is_not_found());
        assert!(StoreError::CollectionNotFound("a".into()).is_not_found());
        assert!(!StoreError::Conflict("a/b".into()).is_not_found());
    }
}
