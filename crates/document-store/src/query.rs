/// Builder for constructing document queries.
///
/// A query always targets one collection and may filter on equality of
/// top-level JSON fields of the document body. Results are ordered by
/// creation time, oldest first.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Collection to search.
    pub collection: String,

    /// Top-level body fields that must equal the given JSON values.
    pub field_equals: Vec<(String, serde_json::Value)>,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,

    /// Number of documents to skip.
    pub offset: Option<usize>,
}

impl DocumentQuery {
    /// Creates a query over every document of a collection.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Adds a `body.field == value` filter.
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.field_equals.push((field.into(), value.into()));
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the document body satisfies every field filter.
    pub fn matches(&self, body: &serde_json::Value) -> bool {
        self.field_equals
            .iter()
            .all(|(field, expected)| body.get(field) == Some(expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_filters() {
        let query = DocumentQuery::collection("orders")
            .field_eq("user_id", "u-1")
            .limit(10)
            .offset(5);

        assert_eq!(query.collection, "orders");
        assert_eq!(query.field_equals.len(), 1);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }

    #[test]
    fn matches_requires_every_field() {
        let query = DocumentQuery::collection("users")
            .field_eq("email", "a@b.c")
            .field_eq("role", "seller");

        assert!(query.matches(&serde_json::json!({"email": "a@b.c", "role": "seller"})));
        assert!(!query.matches(&serde_json::json!({"email": "a@b.c", "role": "user"})));
        assert!(!query.matches(&serde_json::json!({"email": "a@b.c"})));
    }

    #[test]
    fn empty_query_matches_everything() {
        let query = DocumentQuery::collection("users");
        assert!(query.matches(&serde_json::json!({})));
    }
}
