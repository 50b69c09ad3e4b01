use thiserror::Error;

use crate::{DocumentId, Version};

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// A conditional write lost the race: the stored version did not match
    /// the version the caller read.
    #[error(
        "Concurrency conflict for {collection}/{id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        collection: String,
        id: DocumentId,
        expected: Version,
        actual: Version,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocumentStoreError {
    /// Returns true if the error is a lost optimistic-concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DocumentStoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, DocumentStoreError>;
