//! Payment reconciliation for checkout.
//!
//! This crate drives an external provider's two-phase flow for an order:
//! 1. Create a payment intent for the order total
//! 2. Capture it once the buyer has approved
//!
//! A completed capture moves the order from Pending to Paid and clears the
//! buyer's cart. Any other provider status leaves the order untouched.

pub mod error;
pub mod memory;
pub mod paypal;
pub mod provider;
pub mod reconciler;
pub mod token;

pub use error::PaymentError;
pub use memory::InMemoryPaymentProvider;
pub use paypal::{PayPalClient, PayPalConfig};
pub use provider::{CAPTURE_COMPLETED, CaptureOutcome, PaymentIntent, PaymentProvider};
pub use reconciler::{CaptureResult, IntentCreated, PaymentReconciler};
pub use token::{AccessTokenProvider, ClientCredentialsTokenProvider, StaticTokenProvider};
