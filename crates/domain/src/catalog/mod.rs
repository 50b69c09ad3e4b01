//! Product catalog and categories.

mod category;
mod model;
mod service;

pub use category::Category;
pub use model::{MAX_PRICE_CENTS, MAX_PRODUCT_IMAGES, MAX_STOCK, NewProduct, Product, Review};
pub use service::{CatalogService, ProductFilter};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::{CategoryId, ProductId};

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No product with this id.
    #[error("Product not found")]
    ProductNotFound(ProductId),

    /// A product field failed validation.
    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    /// Ratings run from 1 to 5.
    #[error("Invalid rating: {0} (must be between 1 and 5)")]
    InvalidRating(u8),

    #[error("Category not found")]
    CategoryNotFound(CategoryId),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Category names are unique, ignoring case.
    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    /// Products still reference the category.
    #[error("Category is in use by products")]
    CategoryInUse(CategoryId),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::ProductNotFound(_) | CatalogError::CategoryNotFound(_) => {
                ErrorKind::NotFound
            }
            CatalogError::InvalidProduct(_)
            | CatalogError::InvalidRating(_)
            | CatalogError::InvalidCategory(_)
            | CatalogError::DuplicateCategory(_) => ErrorKind::Validation,
            CatalogError::CategoryInUse(_) => ErrorKind::Conflict,
        }
    }
}
