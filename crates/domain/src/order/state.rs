//! Order status state machine.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Paid ──► Shipped ──► Delivered
/// ```
/// `Pending → Paid` happens only through payment capture. Nothing ever
/// moves back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Created from a cart, awaiting payment.
    #[default]
    Pending,

    /// Payment captured.
    Paid,

    /// Handed to the carrier.
    Shipped,

    /// Received by the customer (terminal state).
    Delivered,
}

impl OrderStatus {
    /// Returns true if the order still awaits payment.
    pub fn is_pending(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true once payment has been captured.
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Returns true if `next` is the fulfillment step that follows this status.
    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Paid, OrderStatus::Shipped) | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Paid => "Paid",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            _ => Err(OrderError::UnknownStatus(s.to_string())),
        }
    }
}
