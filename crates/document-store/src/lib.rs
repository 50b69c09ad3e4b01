pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::DocumentId;
pub use document::{Document, Version};
pub use error::{DocumentStoreError, Result};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::DocumentQuery;
pub use store::{DocumentStore, DocumentStoreExt, WriteOptions};
