use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Document, DocumentId, DocumentQuery, DocumentStoreError, Result, Version,
    store::{DocumentStore, WriteOptions},
};

/// PostgreSQL-backed document store implementation.
///
/// Documents live in a single JSONB table keyed by `(collection, id)`.
/// Conditional writes are expressed as `WHERE version = $n` so that the
/// version check and the write happen in one statement. Deletes flag the
/// row instead of removing it, so a key's version never repeats.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            id: DocumentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            collection: row.try_get("collection")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            body: row.try_get("body")?,
        })
    }

    async fn current_version(&self, collection: &str, id: DocumentId) -> Result<Version> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM documents WHERE collection = $1 AND id = $2 AND NOT deleted",
        )
                .bind(collection)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        Ok(version.map(Version::new).unwrap_or(Version::initial()))
    }

    async fn conflict(
        &self,
        collection: &str,
        id: DocumentId,
        expected: Version,
    ) -> DocumentStoreError {
        metrics::counter!("document_conflicts_total", "collection" => collection.to_string())
            .increment(1);
        let actual = match self.current_version(collection, id).await {
            Ok(version) => version,
            Err(e) => return e,
        };
        DocumentStoreError::ConcurrencyConflict {
            collection: collection.to_string(),
            id,
            expected,
            actual,
        }
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, collection, version, created_at, updated_at, body
            FROM documents
            WHERE collection = $1 AND id = $2 AND NOT deleted
            "#,
        )
        .bind(collection)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn put(&self, document: Document, options: WriteOptions) -> Result<Version> {
        let now = Utc::now();

        let version: Option<i64> = match options.expected_version {
            // Insert, or revive a tombstone with the next version.
            Some(expected) if expected == Version::initial() => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO documents (collection, id, version, created_at, updated_at, body)
                    VALUES ($1, $2, 1, $3, $3, $4)
                    ON CONFLICT (collection, id) DO UPDATE SET
                        version = documents.version + 1,
                        created_at = EXCLUDED.created_at,
                        updated_at = EXCLUDED.updated_at,
                        body = EXCLUDED.body,
                        deleted = FALSE
                    WHERE documents.deleted
                    RETURNING version
                    "#,
                )
                .bind(&document.collection)
                .bind(document.id.as_uuid())
                .bind(now)
                .bind(&document.body)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(expected) => {
                sqlx::query_scalar(
                    r#"
                    UPDATE documents
                    SET version = version + 1, updated_at = $3, body = $4
                    WHERE collection = $1 AND id = $2 AND version = $5 AND NOT deleted
                    RETURNING version
                    "#,
                )
                .bind(&document.collection)
                .bind(document.id.as_uuid())
                .bind(now)
                .bind(&document.body)
                .bind(expected.as_i64())
                .fetch_optional(&self.pool)
                .await?
            }
            None => Some(
                sqlx::query_scalar(
                    r#"
                    INSERT INTO documents (collection, id, version, created_at, updated_at, body)
                    VALUES ($1, $2, 1, $3, $3, $4)
                    ON CONFLICT (collection, id) DO UPDATE SET
                        version = documents.version + 1,
                        created_at = CASE WHEN documents.deleted
                            THEN EXCLUDED.created_at ELSE documents.created_at END,
                        updated_at = EXCLUDED.updated_at,
                        body = EXCLUDED.body,
                        deleted = FALSE
                    RETURNING version
                    "#,
                )
                .bind(&document.collection)
                .bind(document.id.as_uuid())
                .bind(now)
                .bind(&document.body)
                .fetch_one(&self.pool)
                .await?,
            ),
        };

        match (version, options.expected_version) {
            (Some(version), _) => Ok(Version::new(version)),
            (None, Some(expected)) => Err(self
                .conflict(&document.collection, document.id, expected)
                .await),
            (None, None) => Ok(Version::initial()),
        }
    }

    async fn delete(
        &self,
        collection: &str,
        id: DocumentId,
        options: WriteOptions,
    ) -> Result<bool> {
        let result = match options.expected_version {
            Some(expected) => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET deleted = TRUE, version = version + 1, updated_at = $3, body = '{}'::jsonb
                    WHERE collection = $1 AND id = $2 AND version = $4 AND NOT deleted
                    "#,
                )
                .bind(collection)
                .bind(id.as_uuid())
                .bind(Utc::now())
                .bind(expected.as_i64())
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET deleted = TRUE, version = version + 1, updated_at = $3, body = '{}'::jsonb
                    WHERE collection = $1 AND id = $2 AND NOT deleted
                    "#,
                )
                .bind(collection)
                .bind(id.as_uuid())
                .bind(Utc::now())
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        match options.expected_version {
            // Deleting something already gone is only a conflict if the
            // caller believed it existed.
            Some(expected) if expected != Version::initial() => {
                Err(self.conflict(collection, id, expected).await)
            }
            _ => Ok(false),
        }
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let mut sql = String::from(
            "SELECT id, collection, version, created_at, updated_at, body FROM documents WHERE collection = $1 AND NOT deleted",
        );
        let mut param_count = 1;

        // Field filters become a single containment check so the GIN index applies
        let filter = (!query.field_equals.is_empty()).then(|| {
            serde_json::Value::Object(query.field_equals.iter().cloned().collect())
        });
        if filter.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND body @> ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at ASC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql).bind(&query.collection);
        if let Some(filter) = filter {
            sqlx_query = sqlx_query.bind(filter);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }
}
