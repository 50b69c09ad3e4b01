use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::DocumentId;

/// Version number for a document, used for optimistic concurrency control.
///
/// A document that has never been written is at version 0. Every successful
/// write increments the version by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of a document that does not exist yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) of a freshly inserted document.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A stored JSON document together with its bookkeeping columns.
///
/// `version`, `created_at` and `updated_at` are owned by the store: values
/// passed in on write are ignored and the stored ones are returned on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document key, unique within its collection.
    pub id: DocumentId,

    /// Collection the document belongs to (e.g. "carts", "orders").
    pub collection: String,

    /// Current stored version.
    pub version: Version,

    /// When the document was first written.
    pub created_at: DateTime<Utc>,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,

    /// The document body.
    pub body: serde_json::Value,
}

impl Document {
    /// Creates an unsaved document with a raw JSON body.
    pub fn new(collection: impl Into<String>, id: DocumentId, body: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            collection: collection.into(),
            version: Version::initial(),
            created_at: now,
            updated_at: now,
            body,
        }
    }

    /// Creates an unsaved document by serializing `value` as its body.
    pub fn from_value<T: Serialize>(
        collection: impl Into<String>,
        id: DocumentId,
        value: &T,
    ) -> crate::Result<Self> {
        Ok(Self::new(collection, id, serde_json::to_value(value)?))
    }

    /// Deserializes the document body into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}
