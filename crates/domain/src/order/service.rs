//! Order service providing the order materializer operations.

use std::sync::Arc;

use document_store::DocumentStore;

use super::{Order, OrderError, OrderStatus, ShippingAddress};
use crate::access::{Capability, Principal, authorize};
use crate::assets::{AssetStore, Upload};
use crate::cart::{Cart, CartError};
use crate::error::DomainError;
use crate::repository::{Change, Committed, Repository};
use crate::value_objects::{OrderId, UserId};

/// Result of an attempt to mark an order paid.
#[derive(Debug, Clone)]
pub struct PaymentTransition {
    /// The order after the attempt.
    pub order: Order,

    /// False if the order had already been paid by an earlier call.
    pub applied: bool,
}

/// Service for managing orders.
pub struct OrderService<S: DocumentStore> {
    orders: Repository<S, Order>,
    carts: Repository<S, Cart>,
    assets: Arc<dyn AssetStore>,
}

impl<S: DocumentStore + Clone> OrderService<S> {
    /// Creates a new order service with the given document store.
    pub fn new(store: S, assets: Arc<dyn AssetStore>) -> Self {
        Self {
            orders: Repository::new(store.clone()),
            carts: Repository::new(store),
            assets,
        }
    }
}

impl<S: DocumentStore> OrderService<S> {
    fn saved(order_id: OrderId, committed: Committed<Order>) -> Result<Order, DomainError> {
        committed
            .into_entity()
            .ok_or_else(|| OrderError::OrderNotFound(order_id).into())
    }

    /// Loads an order without any access check.
    ///
    /// For callers that perform their own authorization, such as the
    /// payment reconciler.
    pub async fn find_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.orders
            .load(order_id.document_id())
            .await?
            .map(|stored| stored.entity)
            .ok_or_else(|| OrderError::OrderNotFound(order_id).into())
    }

    /// Freezes the user's cart into a new pending order.
    ///
    /// The cart is left in place so checkout can be retried.
    #[tracing::instrument(skip(self, shipping_address))]
    pub async fn create_order(
        &self,
        principal: &Principal,
        user_id: UserId,
        shipping_address: ShippingAddress,
    ) -> Result<Order, DomainError> {
        authorize(principal, Capability::PlaceOrder, Some(user_id))?;
        let shipping_address = shipping_address.validated()?;

        let cart = self
            .carts
            .load(user_id.document_id())
            .await?
            .ok_or(CartError::CartNotFound)?
            .entity;

        let order = Order::from_cart(&cart, shipping_address)?;
        let stored = self.orders.insert(order).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %stored.entity.id(),
            total = %stored.entity.total_price(),
            "order created"
        );
        Ok(stored.entity)
    }

    /// Loads an order visible to the caller.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, principal: &Principal, order_id: OrderId) -> Result<Order, DomainError> {
        let order = self.find_order(order_id).await?;
        authorize(principal, Capability::ViewOrder, Some(order.user_id()))?;
        Ok(order)
    }

    /// Lists a user's orders, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(
        &self,
        principal: &Principal,
        user_id: UserId,
    ) -> Result<Vec<Order>, DomainError> {
        authorize(principal, Capability::ViewOrder, Some(user_id))?;
        let query = self.orders.query().field_eq("user_id", user_id.to_string());
        Ok(self
            .orders
            .find(query)
            .await?
            .into_iter()
            .map(|stored| stored.entity)
            .collect())
    }

    /// Deletes an order together with its uploaded attachments.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, principal: &Principal, order_id: OrderId) -> Result<(), DomainError> {
        let order = self.find_order(order_id).await?;
        authorize(principal, Capability::DeleteOrder, Some(order.user_id()))?;

        for url in order.attachments() {
            self.assets.delete(url).await?;
        }
        if !self.orders.delete(order_id.document_id()).await? {
            return Err(OrderError::OrderNotFound(order_id).into());
        }

        tracing::info!(%order_id, "order deleted");
        Ok(())
    }

    /// Uploads a file and attaches it to the caller's order.
    #[tracing::instrument(skip(self, upload), fields(size = upload.bytes.len()))]
    pub async fn attach_asset(
        &self,
        principal: &Principal,
        order_id: OrderId,
        upload: Upload,
    ) -> Result<Order, DomainError> {
        let order = self.find_order(order_id).await?;
        authorize(principal, Capability::PlaceOrder, Some(order.user_id()))?;

        let url = self.assets.upload(upload).await?;
        let result = self
            .orders
            .mutate(order_id.document_id(), |current| {
                let mut order = current.ok_or(OrderError::OrderNotFound(order_id))?;
                order.attach(url.clone());
                Ok(Change::Put(order))
            })
            .await;

        match result {
            Ok(committed) => Self::saved(order_id, committed),
            Err(e) => {
                if let Err(cleanup) = self.assets.delete(&url).await {
                    tracing::warn!(%url, error = %cleanup, "failed to delete orphaned asset");
                }
                Err(e)
            }
        }
    }

    /// Records the provider intent created for a pending order.
    #[tracing::instrument(skip(self))]
    pub async fn bind_payment_intent(
        &self,
        order_id: OrderId,
        intent_id: &str,
    ) -> Result<Order, DomainError> {
        let committed = self
            .orders
            .mutate(order_id.document_id(), |current| {
                let mut order = current.ok_or(OrderError::OrderNotFound(order_id))?;
                order.bind_payment_intent(intent_id)?;
                Ok(Change::Put(order))
            })
            .await?;

        Self::saved(order_id, committed)
    }

    /// Moves a pending order to `Paid` in one conditional write.
    ///
    /// Of several concurrent calls for the same order exactly one reports
    /// `applied`; the rest see the order already paid and write nothing.
    #[tracing::instrument(skip(self))]
    pub async fn mark_paid(
        &self,
        order_id: OrderId,
        intent_id: &str,
        payment_id: &str,
    ) -> Result<PaymentTransition, DomainError> {
        let committed = self
            .orders
            .mutate(order_id.document_id(), |current| {
                let mut order = current.ok_or(OrderError::OrderNotFound(order_id))?;
                if order.mark_paid(intent_id, payment_id)? {
                    Ok(Change::Put(order))
                } else {
                    Ok(Change::Keep)
                }
            })
            .await?;

        let applied = matches!(committed, Committed::Saved(_));
        let order = Self::saved(order_id, committed)?;
        if applied {
            tracing::info!(%order_id, payment_id, "order paid");
        }
        Ok(PaymentTransition { order, applied })
    }

    /// Records that the buyer's cart was emptied after payment.
    #[tracing::instrument(skip(self))]
    pub async fn mark_cart_cleared(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let committed = self
            .orders
            .mutate(order_id.document_id(), |current| {
                let mut order = current.ok_or(OrderError::OrderNotFound(order_id))?;
                if order.mark_cart_cleared() {
                    Ok(Change::Put(order))
                } else {
                    Ok(Change::Keep)
                }
            })
            .await?;

        Self::saved(order_id, committed)
    }

    /// Applies a fulfillment step to a paid order.
    #[tracing::instrument(skip(self))]
    pub async fn advance_status(
        &self,
        principal: &Principal,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, DomainError> {
        let committed = self
            .orders
            .mutate(order_id.document_id(), |current| {
                let mut order = current.ok_or(OrderError::OrderNotFound(order_id))?;
                authorize(principal, Capability::FulfillOrder, Some(order.user_id()))?;
                order.advance_to(status)?;
                Ok(Change::Put(order))
            })
            .await?;

        tracing::info!(%order_id, %status, "order status changed");
        Self::saved(order_id, committed)
    }
}
