//! Core entity trait.

use common::DocumentId;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain types persisted as one document each.
///
/// An entity is the unit of atomic update: every invariant that must hold
/// across its fields is enforced inside a single conditional write.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the collection the entity is stored in.
    fn collection() -> &'static str;

    /// Returns the key of this entity's document.
    fn document_id(&self) -> DocumentId;
}
