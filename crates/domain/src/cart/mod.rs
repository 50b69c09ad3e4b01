//! Cart engine.

mod model;
mod service;

pub use model::Cart;
pub use service::CartService;

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::ProductId;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The user has no cart.
    #[error("Cart not found")]
    CartNotFound,

    /// The cart has no line for this product.
    #[error("Product not in cart")]
    LineNotFound(ProductId),

    /// The product doesn't exist in the catalog.
    #[error("Product not found")]
    ProductNotFound(ProductId),

    /// Not enough stock for the requested quantity.
    #[error("Insufficient stock")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Quantities must be at least 1.
    #[error("Invalid quantity: {0} (must be greater than 0)")]
    InvalidQuantity(u32),

    /// The cart's item count or price would no longer be representable.
    #[error("Cart total too large")]
    TotalTooLarge,
}

impl CartError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartError::CartNotFound
            | CartError::LineNotFound(_)
            | CartError::ProductNotFound(_) => ErrorKind::NotFound,
            CartError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CartError::InvalidQuantity(_) | CartError::TotalTooLarge => ErrorKind::Validation,
        }
    }
}
