use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Document, DocumentId, DocumentQuery, DocumentStoreError, Result, Version,
    store::{DocumentStore, WriteOptions},
};

type Key = (String, DocumentId);

/// Everything the store remembers about one key.
///
/// `version` outlives the document: after a delete the slot stays behind as
/// a tombstone so a recreated document continues the version sequence
/// instead of starting over at 1.
#[derive(Clone)]
struct Slot {
    version: Version,
    document: Option<Document>,
}

impl Slot {
    /// Version of the live document, or `Version::initial()` if there is none.
    fn live_version(&self) -> Version {
        self.document
            .as_ref()
            .map(|d| d.version)
            .unwrap_or(Version::initial())
    }
}

/// In-memory document store implementation.
///
/// Used by tests and by the server when no database is configured. It
/// provides the same conditional-write semantics as the PostgreSQL store.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    slots: Arc<RwLock<HashMap<Key, Slot>>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.slots
            .read()
            .await
            .iter()
            .filter(|((c, _), slot)| c == collection && slot.document.is_some())
            .count()
    }

    /// Removes every document and tombstone.
    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }
}

fn check_expected(
    collection: &str,
    id: DocumentId,
    options: WriteOptions,
    current: Version,
) -> Result<()> {
    if let Some(expected) = options.expected_version
        && current != expected
    {
        metrics::counter!("document_conflicts_total", "collection" => collection.to_string())
            .increment(1);
        return Err(DocumentStoreError::ConcurrencyConflict {
            collection: collection.to_string(),
            id,
            expected,
            actual: current,
        });
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let slots = self.slots.read().await;
        Ok(slots
            .get(&(collection.to_string(), id))
            .and_then(|slot| slot.document.clone()))
    }

    async fn put(&self, mut document: Document, options: WriteOptions) -> Result<Version> {
        let key = (document.collection.clone(), document.id);
        let mut slots = self.slots.write().await;

        let slot = slots.entry(key).or_insert(Slot {
            version: Version::initial(),
            document: None,
        });
        check_expected(&document.collection, document.id, options, slot.live_version())?;

        let now = Utc::now();
        document.created_at = slot.document.as_ref().map(|d| d.created_at).unwrap_or(now);
        document.updated_at = now;
        document.version = slot.version.next();

        slot.version = document.version;
        slot.document = Some(document);
        Ok(slot.version)
    }

    async fn delete(
        &self,
        collection: &str,
        id: DocumentId,
        options: WriteOptions,
    ) -> Result<bool> {
        let key = (collection.to_string(), id);
        let mut slots = self.slots.write().await;

        let Some(slot) = slots.get_mut(&key) else {
            check_expected(collection, id, options, Version::initial())?;
            return Ok(false);
        };
        check_expected(collection, id, options, slot.live_version())?;

        if slot.document.take().is_none() {
            return Ok(false);
        }
        slot.version = slot.version.next();
        Ok(true)
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let slots = self.slots.read().await;
        let mut documents: Vec<_> = slots
            .values()
            .filter_map(|slot| slot.document.as_ref())
            .filter(|d| d.collection == query.collection && query.matches(&d.body))
            .cloned()
            .collect();

        documents.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.id.as_uuid().cmp(&b.id.as_uuid()))
        });

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(documents.into_iter().skip(offset).take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(collection: &str, id: DocumentId, body: serde_json::Value) -> Document {
        Document::new(collection, id, body)
    }

    #[tokio::test]
    async fn put_and_get() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();

        let version = store
            .put(doc("carts", id, serde_json::json!({"n": 1})), WriteOptions::expect_new())
            .await
            .unwrap();
        assert_eq!(version, Version::first());

        let stored = store.get("carts", id).await.unwrap().unwrap();
        assert_eq!(stored.version, Version::first());
        assert_eq!(stored.body["n"], 1);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = InMemoryDocumentStore::new();
        assert!(store.get("carts", DocumentId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        store
            .put(doc("carts", id, serde_json::json!({})), WriteOptions::new())
            .await
            .unwrap();

        assert!(store.get("orders", id).await.unwrap().is_none());
        assert_eq!(store.count("carts").await, 1);
        assert_eq!(store.count("orders").await, 0);
    }

    #[tokio::test]
    async fn expect_new_conflicts_when_present() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        store
            .put(doc("carts", id, serde_json::json!({})), WriteOptions::expect_new())
            .await
            .unwrap();

        let result = store
            .put(doc("carts", id, serde_json::json!({})), WriteOptions::expect_new())
            .await;
        assert!(matches!(
            result,
            Err(DocumentStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        store
            .put(doc("carts", id, serde_json::json!({"n": 1})), WriteOptions::expect_new())
            .await
            .unwrap();
        store
            .put(
                doc("carts", id, serde_json::json!({"n": 2})),
                WriteOptions::expect_version(Version::first()),
            )
            .await
            .unwrap();

        // A writer that still holds version 1 loses.
        let result = store
            .put(
                doc("carts", id, serde_json::json!({"n": 3})),
                WriteOptions::expect_version(Version::first()),
            )
            .await;
        match result {
            Err(DocumentStoreError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Version::first());
                assert_eq!(actual, Version::new(2));
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        let stored = store.get("carts", id).await.unwrap().unwrap();
        assert_eq!(stored.body["n"], 2);
    }

    #[tokio::test]
    async fn update_preserves_created_at() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        store
            .put(doc("carts", id, serde_json::json!({})), WriteOptions::new())
            .await
            .unwrap();
        let first = store.get("carts", id).await.unwrap().unwrap();

        store
            .put(doc("carts", id, serde_json::json!({"x": 1})), WriteOptions::new())
            .await
            .unwrap();
        let second = store.get("carts", id).await.unwrap().unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.version, Version::new(2));
    }

    #[tokio::test]
    async fn delete_with_version_check() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        store
            .put(doc("carts", id, serde_json::json!({})), WriteOptions::expect_new())
            .await
            .unwrap();

        let stale = store
            .delete("carts", id, WriteOptions::expect_version(Version::new(5)))
            .await;
        assert!(stale.is_err());

        let removed = store
            .delete("carts", id, WriteOptions::expect_version(Version::first()))
            .await
            .unwrap();
        assert!(removed);
        assert!(!store.delete("carts", id, WriteOptions::new()).await.unwrap());
    }

    #[tokio::test]
    async fn versions_keep_rising_across_delete() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        store
            .put(doc("carts", id, serde_json::json!({"lines": ["old"]})), WriteOptions::expect_new())
            .await
            .unwrap();
        let stale = store.get("carts", id).await.unwrap().unwrap();

        assert!(store.delete("carts", id, WriteOptions::new()).await.unwrap());
        assert_eq!(store.count("carts").await, 0);
        let recreated = store
            .put(doc("carts", id, serde_json::json!({"lines": ["new"]})), WriteOptions::expect_new())
            .await
            .unwrap();
        assert_eq!(recreated, Version::new(3));

        // A writer still holding the first incarnation must lose.
        let result = store
            .put(
                doc("carts", id, serde_json::json!({"lines": ["old", "more"]})),
                WriteOptions::expect_version(stale.version),
            )
            .await;
        assert!(matches!(
            result,
            Err(DocumentStoreError::ConcurrencyConflict { actual, .. }) if actual == Version::new(3)
        ));

        let stored = store.get("carts", id).await.unwrap().unwrap();
        assert_eq!(stored.body["lines"], serde_json::json!(["new"]));
    }

    #[tokio::test]
    async fn stale_delete_after_recreate_conflicts() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        let first = store
            .put(doc("carts", id, serde_json::json!({})), WriteOptions::expect_new())
            .await
            .unwrap();
        store.delete("carts", id, WriteOptions::new()).await.unwrap();
        store
            .put(doc("carts", id, serde_json::json!({})), WriteOptions::expect_new())
            .await
            .unwrap();

        let result = store
            .delete("carts", id, WriteOptions::expect_version(first))
            .await;
        assert!(result.is_err());
        assert!(store.get("carts", id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn query_filters_and_paginates() {
        let store = InMemoryDocumentStore::new();
        for i in 0..5 {
            let owner = if i % 2 == 0 { "alice" } else { "bob" };
            store
                .put(
                    doc("orders", DocumentId::new(), serde_json::json!({"owner": owner, "i": i})),
                    WriteOptions::new(),
                )
                .await
                .unwrap();
        }

        let alice = store
            .query(DocumentQuery::collection("orders").field_eq("owner", "alice"))
            .await
            .unwrap();
        assert_eq!(alice.len(), 3);

        let page = store
            .query(DocumentQuery::collection("orders").offset(1).limit(2))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
    }
}
