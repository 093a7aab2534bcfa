//! Error types for modelfs.
//!
//! Every record entry point checks existence explicitly and reports a missing
//! row as [`StorageError::NotFound`]. Backend failures are converted with
//! `#[from]` and propagated unchanged.

use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Common error type for the storage facades and their backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Record row does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// File or folder name that would leave the resource folder
    #[error("Invalid storage name: {0:?}")]
    InvalidName(String),

    /// Operation not offered by this backend
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Local filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record or JSON store database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Zip archive error
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Sync provider failure
    #[error(transparent)]
    Sync(#[from] anyhow::Error),
}

impl StorageError {
    pub(crate) fn predictor_not_found(id: i64) -> Self {
        StorageError::NotFound {
            kind: "Predictor",
            id,
        }
    }

    pub(crate) fn integration_not_found(id: i64) -> Self {
        StorageError::NotFound {
            kind: "Integration",
            id,
        }
    }

    /// Returns true if the error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    /// Returns true if a name was rejected as a storage key
    pub fn is_invalid_name(&self) -> bool {
        matches!(self, StorageError::InvalidName(_))
    }

    /// Returns true if the operation is not supported by the backend
    pub fn is_unsupported(&self) -> bool {
        matches!(self, StorageError::Unsupported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StorageError::predictor_not_found(42);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Predictor 42 not found");
    }

    #[test]
    fn test_sync_error_is_transparent() {
        let err: StorageError = anyhow::anyhow!("remote unreachable").into();
        assert_eq!(err.to_string(), "remote unreachable");
        assert!(!err.is_not_found());
    }
}
