//! Order materializer.

mod address;
mod model;
mod service;
mod state;

pub use address::{SHIPPING_FIELDS, ShippingAddress};
pub use model::Order;
pub use service::{OrderService, PaymentTransition};
pub use state::OrderStatus;

#[cfg(test)]
pub(crate) use address::sample_address;

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::OrderId;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No order with this id.
    #[error("Order not found")]
    OrderNotFound(OrderId),

    /// Required shipping fields were blank.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingShippingFields(Vec<String>),

    /// A shipping field was present but malformed.
    #[error("Invalid shipping address: {0}")]
    InvalidShippingAddress(String),

    /// Checkout was attempted with an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The requested status change isn't a valid next step.
    #[error("Invalid state transition: cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The operation needs an order that still awaits payment.
    #[error("Order is already {0}")]
    NotPending(OrderStatus),

    /// Capture named a different payment than the one started for this order.
    #[error("Payment does not belong to this order")]
    PaymentIntentMismatch,

    /// Unrecognised status name.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::OrderNotFound(_) => ErrorKind::NotFound,
            OrderError::MissingShippingFields(_)
            | OrderError::InvalidShippingAddress(_)
            | OrderError::EmptyCart
            | OrderError::PaymentIntentMismatch
            | OrderError::UnknownStatus(_) => ErrorKind::Validation,
            OrderError::InvalidTransition { .. } | OrderError::NotPending(_) => {
                ErrorKind::Conflict
            }
        }
    }
}
