//! Cart service providing the cart engine operations.

use document_store::DocumentStore;

use super::{Cart, CartError};
use crate::access::{Capability, Principal, authorize};
use crate::catalog::Product;
use crate::error::DomainError;
use crate::repository::{Change, Committed, Repository};
use crate::value_objects::{ProductId, UserId};

fn record_mutation(operation: &'static str) {
    metrics::counter!("cart_mutations_total", "operation" => operation).increment(1);
}

/// Service for managing carts.
///
/// Each operation is a single read-modify-write of the cart document, so
/// concurrent requests from the same user never lose updates. Product stock
/// is read before the cart is touched and never written here.
pub struct CartService<S: DocumentStore> {
    carts: Repository<S, Cart>,
    products: Repository<S, Product>,
}

impl<S: DocumentStore + Clone> CartService<S> {
    /// Creates a new cart service with the given document store.
    pub fn new(store: S) -> Self {
        Self {
            carts: Repository::new(store.clone()),
            products: Repository::new(store),
        }
    }
}

impl<S: DocumentStore> CartService<S> {
    async fn product(&self, product_id: ProductId) -> Result<Product, DomainError> {
        self.products
            .load(product_id.document_id())
            .await?
            .map(|stored| stored.entity)
            .ok_or_else(|| CartError::ProductNotFound(product_id).into())
    }

    fn saved(committed: Committed<Cart>) -> Result<Cart, DomainError> {
        committed
            .into_entity()
            .ok_or_else(|| CartError::CartNotFound.into())
    }

    /// Adds units of a product, creating the cart on first use.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        principal: &Principal,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, DomainError> {
        authorize(principal, Capability::ManageCart, Some(user_id))?;
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity).into());
        }
        let product = self.product(product_id).await?;

        let committed = self
            .carts
            .mutate(user_id.document_id(), |current| {
                let mut cart = current.unwrap_or_else(|| Cart::new(user_id));
                cart.add(&product, quantity)?;
                Ok(Change::Put(cart))
            })
            .await?;

        record_mutation("add");
        Self::saved(committed)
    }

    /// Raises the quantity of a product already in the cart.
    #[tracing::instrument(skip(self))]
    pub async fn increase_item(
        &self,
        principal: &Principal,
        user_id: UserId,
        product_id: ProductId,
        delta: u32,
    ) -> Result<Cart, DomainError> {
        authorize(principal, Capability::ManageCart, Some(user_id))?;
        let product = self.product(product_id).await?;

        let committed = self
            .carts
            .mutate(user_id.document_id(), |current| {
                let mut cart = current.ok_or(CartError::CartNotFound)?;
                cart.increase(product_id, delta, product.stock)?;
                Ok(Change::Put(cart))
            })
            .await?;

        record_mutation("increase");
        Self::saved(committed)
    }

    /// Lowers the quantity of a product in the cart.
    ///
    /// The line disappears when its quantity would reach zero; the cart
    /// itself is kept even if that leaves it empty.
    #[tracing::instrument(skip(self))]
    pub async fn decrease_item(
        &self,
        principal: &Principal,
        user_id: UserId,
        product_id: ProductId,
        delta: u32,
    ) -> Result<Cart, DomainError> {
        authorize(principal, Capability::ManageCart, Some(user_id))?;

        let committed = self
            .carts
            .mutate(user_id.document_id(), |current| {
                let mut cart = current.ok_or(CartError::CartNotFound)?;
                cart.decrease(product_id, delta)?;
                Ok(Change::Put(cart))
            })
            .await?;

        record_mutation("decrease");
        Self::saved(committed)
    }

    /// Removes a product from the cart.
    ///
    /// Returns None when that was the last line and the cart was deleted.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        principal: &Principal,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Cart>, DomainError> {
        authorize(principal, Capability::ManageCart, Some(user_id))?;

        let committed = self
            .carts
            .mutate(user_id.document_id(), |current| {
                let mut cart = current.ok_or(CartError::CartNotFound)?;
                cart.remove(product_id)?;
                if cart.is_empty() {
                    Ok(Change::Delete)
                } else {
                    Ok(Change::Put(cart))
                }
            })
            .await?;

        record_mutation("remove");
        Ok(committed.into_entity())
    }

    /// Returns the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, principal: &Principal, user_id: UserId) -> Result<Cart, DomainError> {
        authorize(principal, Capability::ManageCart, Some(user_id))?;
        self.carts
            .load(user_id.document_id())
            .await?
            .map(|stored| stored.entity)
            .ok_or_else(|| CartError::CartNotFound.into())
    }

    /// Deletes the user's cart. A missing cart is not an error.
    ///
    /// Called when a checkout completes; returns true if a cart was removed.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: UserId) -> Result<bool, DomainError> {
        let removed = self.carts.delete(user_id.document_id()).await?;
        if removed {
            record_mutation("clear");
        }
        Ok(removed)
    }
}
