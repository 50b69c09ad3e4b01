//! Typed persistence with optimistic read-modify-write.

use std::marker::PhantomData;

use common::DocumentId;
use document_store::{Document, DocumentQuery, DocumentStore, DocumentStoreExt, Version, WriteOptions};

use crate::entity::Entity;
use crate::error::DomainError;

/// Default number of attempts `mutate` makes before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// An entity together with the version it was read or written at.
#[derive(Debug, Clone)]
pub struct Stored<E> {
    pub entity: E,
    pub version: Version,
}

/// What a mutation decided to do with the document.
#[derive(Debug)]
pub enum Change<E> {
    /// Write this value.
    Put(E),
    /// Remove the document.
    Delete,
    /// Leave the document as it is.
    Keep,
}

/// Outcome of a committed mutation.
#[derive(Debug)]
pub enum Committed<E> {
    /// The new value was written.
    Saved(Stored<E>),
    /// The document was removed.
    Deleted,
    /// Nothing was written; carries the value that was read, if any.
    Unchanged(Option<Stored<E>>),
}

impl<E> Committed<E> {
    /// Returns the entity after the mutation, if one exists.
    pub fn into_entity(self) -> Option<E> {
        match self {
            Committed::Saved(stored) => Some(stored.entity),
            Committed::Unchanged(stored) => stored.map(|s| s.entity),
            Committed::Deleted => None,
        }
    }
}

/// Repository for loading and updating entities of one type.
///
/// `mutate` is the critical section for a single document: it reads the
/// current value, runs the caller's closure, and writes the result back
/// only if nobody else wrote in between. A lost race re-reads and re-runs
/// the closure.
pub struct Repository<S, E>
where
    S: DocumentStore,
    E: Entity,
{
    store: S,
    max_attempts: u32,
    _phantom: PhantomData<E>,
}

impl<S, E> Repository<S, E>
where
    S: DocumentStore,
    E: Entity,
{
    /// Creates a new repository over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            _phantom: PhantomData,
        }
    }

    /// Overrides the number of attempts `mutate` makes on conflicts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns a query over this entity's collection.
    pub fn query(&self) -> DocumentQuery {
        DocumentQuery::collection(E::collection())
    }

    /// Loads an entity, returning None if it doesn't exist.
    pub async fn load(&self, id: DocumentId) -> Result<Option<Stored<E>>, DomainError> {
        self.store
            .get(E::collection(), id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Inserts a new entity, failing with `Conflict` if it already exists.
    pub async fn insert(&self, entity: E) -> Result<Stored<E>, DomainError> {
        let document = Document::from_value(E::collection(), entity.document_id(), &entity)?;
        match self.store.put(document, WriteOptions::expect_new()).await {
            Ok(version) => Ok(Stored { entity, version }),
            Err(e) if e.is_conflict() => Err(DomainError::Conflict(format!(
                "{} {} already exists",
                E::collection(),
                entity.document_id()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes an entity unconditionally. Returns true if it existed.
    pub async fn delete(&self, id: DocumentId) -> Result<bool, DomainError> {
        Ok(self
            .store
            .delete(E::collection(), id, WriteOptions::new())
            .await?)
    }

    /// Returns every entity matching the query.
    pub async fn find(&self, query: DocumentQuery) -> Result<Vec<Stored<E>>, DomainError> {
        self.store
            .query(query)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Returns the first entity matching the query.
    pub async fn find_one(&self, query: DocumentQuery) -> Result<Option<Stored<E>>, DomainError> {
        self.store.find_one(query).await?.map(decode).transpose()
    }

    /// Applies `change` to the current value of a document atomically.
    ///
    /// The closure receives the current entity (or None) and may be called
    /// more than once, so it must not have side effects. An error from the
    /// closure aborts the mutation without writing anything.
    pub async fn mutate<F>(&self, id: DocumentId, mut change: F) -> Result<Committed<E>, DomainError>
    where
        F: FnMut(Option<E>) -> Result<Change<E>, DomainError>,
    {
        for attempt in 1..=self.max_attempts {
            let current = self.load(id).await?;
            let read_version = current
                .as_ref()
                .map(|s| s.version)
                .unwrap_or(Version::initial());
            let options = WriteOptions::expect_version(read_version);

            let outcome = match change(current.as_ref().map(|s| s.entity.clone()))? {
                Change::Keep => return Ok(Committed::Unchanged(current)),
                Change::Delete if current.is_none() => return Ok(Committed::Unchanged(None)),
                Change::Delete => self
                    .store
                    .delete(E::collection(), id, options)
                    .await
                    .map(|_| Committed::Deleted),
                Change::Put(entity) => {
                    debug_assert_eq!(entity.document_id(), id);
                    let document = Document::from_value(E::collection(), id, &entity)?;
                    self.store
                        .put(document, options)
                        .await
                        .map(|version| Committed::Saved(Stored { entity, version }))
                }
            };

            match outcome {
                Ok(committed) => return Ok(committed),
                Err(e) if e.is_conflict() => {
                    tracing::debug!(
                        collection = E::collection(),
                        %id,
                        attempt,
                        "write conflict, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(collection = E::collection(), %id, "giving up after repeated write conflicts");
        Err(DomainError::Conflict(format!(
            "{} {} is being modified concurrently",
            E::collection(),
            id
        )))
    }
}

fn decode<E: Entity>(document: Document) -> Result<Stored<E>, DomainError> {
    let version = document.version;
    Ok(Stored {
        entity: document.decode()?,
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::InMemoryDocumentStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        id: DocumentId,
        value: u32,
    }

    impl Entity for Counter {
        fn collection() -> &'static str {
            "counters"
        }

        fn document_id(&self) -> DocumentId {
            self.id
        }
    }

    fn repo() -> Repository<InMemoryDocumentStore, Counter> {
        Repository::new(InMemoryDocumentStore::new())
    }

    fn increment(id: DocumentId) -> impl FnMut(Option<Counter>) -> Result<Change<Counter>, DomainError> {
        move |current| {
            let mut counter = current.unwrap_or(Counter { id, value: 0 });
            counter.value += 1;
            Ok(Change::Put(counter))
        }
    }

    #[tokio::test]
    async fn test_mutate_creates_missing_document() {
        let repo = repo();
        let id = DocumentId::new();

        let committed = repo.mutate(id, increment(id)).await.unwrap();
        match committed {
            Committed::Saved(stored) => {
                assert_eq!(stored.entity.value, 1);
                assert_eq!(stored.version, Version::first());
            }
            other => panic!("expected save, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mutate_keep_writes_nothing() {
        let repo = repo();
        let id = DocumentId::new();
        repo.insert(Counter { id, value: 3 }).await.unwrap();

        let committed = repo.mutate(id, |_| Ok(Change::Keep)).await.unwrap();
        assert!(matches!(committed, Committed::Unchanged(Some(_))));
        assert_eq!(repo.load(id).await.unwrap().unwrap().version, Version::first());
    }

    #[tokio::test]
    async fn test_mutate_error_aborts() {
        let repo = repo();
        let id = DocumentId::new();
        repo.insert(Counter { id, value: 3 }).await.unwrap();

        let result = repo
            .mutate(id, |_| Err(DomainError::validation("nope")))
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(repo.load(id).await.unwrap().unwrap().entity.value, 3);
    }

    #[tokio::test]
    async fn test_mutate_delete() {
        let repo = repo();
        let id = DocumentId::new();
        repo.insert(Counter { id, value: 1 }).await.unwrap();

        let committed = repo.mutate(id, |_| Ok(Change::Delete)).await.unwrap();
        assert!(matches!(committed, Committed::Deleted));
        assert!(repo.load(id).await.unwrap().is_none());

        let again = repo.mutate(id, |_| Ok(Change::Delete)).await.unwrap();
        assert!(matches!(again, Committed::Unchanged(None)));
    }

    #[tokio::test]
    async fn test_insert_twice_conflicts() {
        let repo = repo();
        let id = DocumentId::new();
        repo.insert(Counter { id, value: 1 }).await.unwrap();

        let result = repo.insert(Counter { id, value: 2 }).await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_concurrent_mutations_lose_no_updates() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo: Repository<_, Counter> =
                Repository::new(store.clone()).with_max_attempts(100);
            handles.push(tokio::spawn(async move {
                repo.mutate(id, increment(id)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let repo: Repository<_, Counter> = Repository::new(store);
        assert_eq!(repo.load(id).await.unwrap().unwrap().entity.value, 8);
    }

    #[tokio::test]
    async fn test_find_filters_by_field() {
        let repo = repo();
        for value in [1, 2, 2] {
            repo.insert(Counter {
                id: DocumentId::new(),
                value,
            })
            .await
            .unwrap();
        }

        let twos = repo.find(repo.query().field_eq("value", 2)).await.unwrap();
        assert_eq!(twos.len(), 2);
        assert!(repo.find_one(repo.query().field_eq("value", 9)).await.unwrap().is_none());
    }
}
