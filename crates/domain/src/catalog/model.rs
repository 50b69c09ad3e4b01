use chrono::{DateTime, Utc};
use common::DocumentId;
use serde::{Deserialize, Serialize};

use super::CatalogError;
use crate::entity::Entity;
use crate::value_objects::{CategoryId, Money, ProductId, UserId};

pub(crate) const MAX_TITLE_CHARS: usize = 100;
pub(crate) const MIN_DESCRIPTION_CHARS: usize = 50;

/// Highest accepted unit price, in cents.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Highest stock a product may carry.
pub const MAX_STOCK: u32 = 1_000_000;

/// Images a product gallery may hold.
pub const MAX_PRODUCT_IMAGES: usize = 8;

/// Fields supplied when listing a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub category: CategoryId,
    pub price: Money,
    pub stock: u32,
}

/// Checks a stock level against the cap.
pub(crate) fn check_stock(stock: u32) -> Result<(), CatalogError> {
    if stock > MAX_STOCK {
        return Err(CatalogError::InvalidProduct(format!(
            "stock must be at most {MAX_STOCK}"
        )));
    }
    Ok(())
}

impl NewProduct {
    /// Checks field rules, returning every violation at once.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut problems = Vec::new();

        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            problems.push("title is required".to_string());
        } else if title_len > MAX_TITLE_CHARS {
            problems.push(format!("title must be at most {MAX_TITLE_CHARS} characters"));
        }
        if self.description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
            problems.push(format!(
                "description must be at least {MIN_DESCRIPTION_CHARS} characters"
            ));
        }
        if self.price.is_negative() {
            problems.push("price must not be negative".to_string());
        } else if self.price.cents() > MAX_PRICE_CENTS {
            problems.push(format!(
                "price must be at most {}",
                Money::from_cents(MAX_PRICE_CENTS)
            ));
        }
        if let Err(CatalogError::InvalidProduct(problem)) = check_stock(self.stock) {
            problems.push(problem);
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::InvalidProduct(problems.join(", ")))
        }
    }
}

/// A customer review of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub user_id: UserId,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A product in the catalog.
///
/// `stock` is the source of truth for availability. Carts and orders only
/// read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: UserId,
    pub title: String,
    pub description: String,
    pub category: CategoryId,
    pub price: Money,
    pub stock: u32,
    pub images: Vec<String>,
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product from validated fields and stored image URLs.
    pub fn new(seller_id: UserId, fields: NewProduct, images: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::new(),
            seller_id,
            title: fields.title.trim().to_string(),
            description: fields.description.trim().to_string(),
            category: fields.category,
            price: fields.price,
            stock: fields.stock,
            images,
            reviews: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The image copied into cart lines.
    pub fn primary_image(&self) -> Option<String> {
        self.images.first().cloned()
    }

    /// Records a review. A user's newer review replaces their older one.
    pub fn add_review(
        &mut self,
        user_id: UserId,
        rating: u8,
        comment: Option<String>,
    ) -> Result<(), CatalogError> {
        if !(1..=5).contains(&rating) {
            return Err(CatalogError::InvalidRating(rating));
        }
        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        self.reviews.retain(|r| r.user_id != user_id);
        self.reviews.push(Review {
            user_id,
            rating,
            comment,
            created_at: Utc::now(),
        });
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mean rating, or None when unreviewed.
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let sum: u32 = self.reviews.iter().map(|r| r.rating as u32).sum();
        Some(sum as f64 / self.reviews.len() as f64)
    }
}

impl Entity for Product {
    fn collection() -> &'static str {
        "products"
    }

    fn document_id(&self) -> DocumentId {
        self.id.document_id()
    }
}
