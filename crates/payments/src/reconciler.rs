//! Payment reconciler.
//!
//! Keeps orders in step with the provider: an intent is created for the
//! order total and bound to the order, and a completed capture moves the
//! order to `Paid` exactly once and empties the buyer's cart. Emptying the
//! cart is recorded on the order, so a capture retried after a failed
//! clear finishes the job.

use std::sync::Arc;
use std::time::Instant;

use document_store::DocumentStore;
use domain::{
    Capability, CartService, DomainError, Order, OrderError, OrderId, OrderService, Principal,
    authorize,
};
use serde::Serialize;

use crate::error::{PaymentError, Result};
use crate::provider::PaymentProvider;

/// Response of a successful intent creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentCreated {
    /// Provider-side id the buyer approves.
    pub paypal_order_id: String,
    pub order_id: OrderId,
}

/// Result of a capture.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    /// The order as stored after the capture.
    pub order: Order,

    /// False if an earlier capture had already paid the order.
    pub applied: bool,
}

/// Coordinates orders, carts and the payment provider.
pub struct PaymentReconciler<S: DocumentStore, P: PaymentProvider> {
    orders: Arc<OrderService<S>>,
    carts: Arc<CartService<S>>,
    provider: P,
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(PaymentError::validation(format!("{name} is required"))),
    }
}

fn parse_order_id(value: &str) -> Result<OrderId> {
    value
        .parse()
        .map_err(|_| PaymentError::validation(format!("Invalid orderId: {value}")))
}

impl<S: DocumentStore, P: PaymentProvider> PaymentReconciler<S, P> {
    /// Creates a new reconciler.
    pub fn new(orders: Arc<OrderService<S>>, carts: Arc<CartService<S>>, provider: P) -> Self {
        Self {
            orders,
            carts,
            provider,
        }
    }

    /// Returns the payment provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Empties the buyer's cart for a paid order that still owes it.
    async fn clear_cart_for(&self, order: Order) -> Result<Order> {
        if !order.needs_cart_clear() {
            return Ok(order);
        }
        if let Err(e) = self.carts.clear_cart(order.user_id()).await {
            tracing::warn!(order_id = %order.id(), error = %e, "clearing cart after payment failed");
            return Err(e.into());
        }
        Ok(self.orders.mark_cart_cleared(order.id()).await?)
    }

    /// Creates a provider intent for the full order total.
    ///
    /// Calling again for a still-pending order creates a fresh intent that
    /// replaces the previous binding.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn create_payment_intent(
        &self,
        principal: &Principal,
        order_id: Option<&str>,
    ) -> Result<IntentCreated> {
        let order_id = parse_order_id(required(order_id, "orderId")?)?;
        let order = self.orders.find_order(order_id).await?;
        authorize(principal, Capability::PayOrder, Some(order.user_id()))
            .map_err(DomainError::from)?;
        if !order.status().is_pending() {
            return Err(DomainError::from(OrderError::NotPending(order.status())).into());
        }

        let intent = match self
            .provider
            .create_intent(&order_id.to_string(), order.total_price())
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                metrics::counter!("payment_failures_total", "stage" => "create").increment(1);
                tracing::warn!(%order_id, error = %e, "payment intent creation failed");
                return Err(e);
            }
        };
        self.orders.bind_payment_intent(order_id, &intent.id).await?;

        metrics::counter!("payment_intents_created_total").increment(1);
        tracing::info!(%order_id, intent_id = %intent.id, total = %order.total_price(), "payment intent created");
        Ok(IntentCreated {
            paypal_order_id: intent.id,
            order_id,
        })
    }

    /// Captures an approved intent and settles the order.
    ///
    /// The intent is checked against the order once, before the provider
    /// is asked. Repeating a successful capture returns the paid order
    /// without contacting the provider again.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn capture_payment(
        &self,
        principal: &Principal,
        intent_id: Option<&str>,
        order_id: Option<&str>,
    ) -> Result<CaptureResult> {
        let intent_id = required(intent_id, "paypalOrderId")?;
        let order_id = parse_order_id(required(order_id, "orderId")?)?;

        let order = self.orders.find_order(order_id).await?;
        authorize(principal, Capability::PayOrder, Some(order.user_id()))
            .map_err(DomainError::from)?;
        order
            .check_payment_intent(intent_id)
            .map_err(DomainError::from)?;

        if order.status().is_settled() {
            tracing::debug!(%order_id, "order already paid");
            return Ok(CaptureResult {
                order: self.clear_cart_for(order).await?,
                applied: false,
            });
        }

        let start = Instant::now();
        let outcome = self.provider.capture(intent_id).await;
        metrics::histogram!("payment_capture_duration_seconds").record(start.elapsed().as_secs_f64());

        let outcome = match outcome {
            Ok(outcome) if outcome.is_completed() => outcome,
            Ok(outcome) => {
                metrics::counter!("payment_failures_total", "stage" => "capture").increment(1);
                tracing::warn!(%order_id, status = %outcome.status, "capture not completed");
                return Err(PaymentError::PaymentFailed {
                    status: outcome.status,
                });
            }
            Err(e) => {
                metrics::counter!("payment_failures_total", "stage" => "capture").increment(1);
                tracing::warn!(%order_id, error = %e, "capture failed");
                return Err(e);
            }
        };

        let payment_id = outcome.capture_id.as_deref().unwrap_or(intent_id);
        let transition = self.orders.mark_paid(order_id, intent_id, payment_id).await?;

        if transition.applied {
            metrics::counter!("payment_captures_total").increment(1);
            tracing::info!(%order_id, payment_id, "payment captured");
        }

        Ok(CaptureResult {
            order: self.clear_cart_for(transition.order).await?,
            applied: transition.applied,
        })
    }
}
