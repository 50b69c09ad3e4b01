use chrono::{DateTime, Utc};
use common::DocumentId;
use serde::{Deserialize, Serialize};

use super::CatalogError;
use crate::entity::Entity;
use crate::value_objects::CategoryId;

pub(crate) const MAX_CATEGORY_NAME_CHARS: usize = 50;

/// A product category with its cover image.
///
/// The id is derived from the name, so two categories can never share one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Checks a proposed category name and returns it trimmed.
    pub fn validate_name(name: &str) -> Result<&str, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidCategory(
                "name and image are required".into(),
            ));
        }
        if name.chars().count() > MAX_CATEGORY_NAME_CHARS {
            return Err(CatalogError::InvalidCategory(format!(
                "name must be at most {MAX_CATEGORY_NAME_CHARS} characters"
            )));
        }
        Ok(name)
    }

    pub fn new(name: &str, image: String) -> Self {
        let name = name.trim();
        Self {
            id: CategoryId::for_name(name),
            name: name.to_string(),
            image,
            created_at: Utc::now(),
        }
    }
}

impl Entity for Category {
    fn collection() -> &'static str {
        "categories"
    }

    fn document_id(&self) -> DocumentId {
        self.id.document_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_rules() {
        assert_eq!(Category::validate_name("  Garden ").unwrap(), "Garden");
        assert!(Category::validate_name("   ").is_err());
        assert!(Category::validate_name(&"x".repeat(MAX_CATEGORY_NAME_CHARS + 1)).is_err());
    }

    #[test]
    fn test_id_is_derived_from_name() {
        let category = Category::new(" Garden", "/uploads/a.png".into());
        assert_eq!(category.name, "Garden");
        assert_eq!(category.id, CategoryId::for_name("garden"));
    }
}
