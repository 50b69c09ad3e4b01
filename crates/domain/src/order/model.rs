use chrono::{DateTime, Utc};
use common::DocumentId;
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus, ShippingAddress};
use crate::cart::Cart;
use crate::entity::Entity;
use crate::value_objects::{LineItem, Money, OrderId, UserId};

/// An order frozen from a cart at checkout.
///
/// Lines and totals are copied from the cart once and never recomputed
/// from it again. Only the payment and fulfillment fields change later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    lines: Vec<LineItem>,
    shipping_address: ShippingAddress,
    total_items: u32,
    total_price: Money,
    status: OrderStatus,
    payment_intent_id: Option<String>,
    payment_id: Option<String>,
    attachments: Vec<String>,
    /// Set once the buyer's cart has been emptied after payment.
    #[serde(default)]
    cart_cleared_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Materializes a pending order from the cart's current contents.
    pub fn from_cart(cart: &Cart, shipping_address: ShippingAddress) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            user_id: cart.user_id(),
            lines: cart.lines().to_vec(),
            shipping_address,
            total_items: cart.total_items(),
            total_price: cart.total_price(),
            status: OrderStatus::Pending,
            payment_intent_id: None,
            payment_id: None,
            attachments: Vec::new(),
            cart_cleared_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent_id.as_deref()
    }

    pub fn payment_id(&self) -> Option<&str> {
        self.payment_id.as_deref()
    }

    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    pub fn cart_cleared_at(&self) -> Option<DateTime<Utc>> {
        self.cart_cleared_at
    }

    /// True while a paid order still owes the buyer an empty cart.
    pub fn needs_cart_clear(&self) -> bool {
        self.status.is_settled() && self.cart_cleared_at.is_none()
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records the provider intent started for this order.
    ///
    /// Starting a new intent replaces the previous one.
    pub fn bind_payment_intent(&mut self, intent_id: impl Into<String>) -> Result<(), OrderError> {
        if !self.status.is_pending() {
            return Err(OrderError::NotPending(self.status));
        }
        self.payment_intent_id = Some(intent_id.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Fails if a different intent is bound to this order.
    pub fn check_payment_intent(&self, intent_id: &str) -> Result<(), OrderError> {
        match &self.payment_intent_id {
            Some(bound) if bound != intent_id => Err(OrderError::PaymentIntentMismatch),
            _ => Ok(()),
        }
    }

    /// Moves a pending order to `Paid`, recording the captured intent.
    ///
    /// The intent is not compared with the bound one: by the time a
    /// capture completes the money has moved, and a newer binding must not
    /// undo that. Returns false, changing nothing, if the order was
    /// already paid.
    pub fn mark_paid(
        &mut self,
        intent_id: &str,
        payment_id: impl Into<String>,
    ) -> Result<bool, OrderError> {
        if !self.status.is_pending() {
            return Ok(false);
        }

        self.status = OrderStatus::Paid;
        self.payment_intent_id = Some(intent_id.to_string());
        self.payment_id = Some(payment_id.into());
        self.updated_at = Utc::now();
        Ok(true)
    }

    /// Records that the buyer's cart was emptied. Returns false if it
    /// already was.
    pub fn mark_cart_cleared(&mut self) -> bool {
        if self.cart_cleared_at.is_some() {
            return false;
        }
        let now = Utc::now();
        self.cart_cleared_at = Some(now);
        self.updated_at = now;
        true
    }

    /// Applies a fulfillment step (`Paid → Shipped → Delivered`).
    pub fn advance_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_advance_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let now = Utc::now();
        self.status = next;
        if next == OrderStatus::Delivered {
            self.delivered_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Appends the URL of an uploaded attachment.
    pub fn attach(&mut self, url: impl Into<String>) {
        self.attachments.push(url.into());
        self.updated_at = Utc::now();
    }
}

impl Entity for Order {
    fn collection() -> &'static str {
        "orders"
    }

    fn document_id(&self) -> DocumentId {
        self.id.document_id()
    }
}
