use async_trait::async_trait;

use crate::{Document, DocumentId, DocumentQuery, Result, Version};

/// Options for conditional writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Version the caller expects the stored document to be at.
    /// If None, no version check is performed (use with caution).
    pub expected_version: Option<Version>,
}

impl WriteOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the document to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the document to not exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Core trait for document store implementations.
///
/// A document store keeps one JSON body per `(collection, id)` key and
/// supports single-document conditional writes. Multi-document
/// transactions are deliberately not offered.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Retrieves a document by key.
    ///
    /// Returns None if the document doesn't exist.
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>>;

    /// Inserts or replaces a document.
    ///
    /// If `options.expected_version` is set, the write fails with
    /// `ConcurrencyConflict` unless the stored version matches
    /// (`Version::initial()` means "must not exist").
    ///
    /// Returns the new version of the document.
    async fn put(&self, document: Document, options: WriteOptions) -> Result<Version>;

    /// Deletes a document.
    ///
    /// Follows the same version check as `put`. Returns true if a document
    /// was removed. The key keeps its version: writing it again continues
    /// from there rather than restarting at `Version::first()`.
    async fn delete(&self, collection: &str, id: DocumentId, options: WriteOptions)
    -> Result<bool>;

    /// Retrieves documents matching a query.
    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Checks if a document exists.
    async fn exists(&self, collection: &str, id: DocumentId) -> Result<bool> {
        Ok(self.get(collection, id).await?.is_some())
    }

    /// Returns the first document matching the query, if any.
    async fn find_one(&self, query: DocumentQuery) -> Result<Option<Document>> {
        Ok(self.query(query.limit(1)).await?.into_iter().next())
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
