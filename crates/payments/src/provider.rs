//! Payment provider abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use domain::Money;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Provider status for a successfully captured payment.
pub const CAPTURE_COMPLETED: &str = "COMPLETED";

/// A payment intent created at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider-side id the buyer approves and the capture refers to.
    pub id: String,
    pub status: String,
}

/// What the provider reported for a capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOutcome {
    pub status: String,
    /// Id of the capture itself, when the provider reports one.
    pub capture_id: Option<String>,
}

impl CaptureOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == CAPTURE_COMPLETED
    }
}

/// Trait for two-phase payment providers.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates an intent to collect `amount`, tagged with `reference`.
    async fn create_intent(&self, reference: &str, amount: Money) -> Result<PaymentIntent>;

    /// Captures an approved intent. Safe to call again for the same intent.
    async fn capture(&self, intent_id: &str) -> Result<CaptureOutcome>;
}

#[async_trait]
impl<P: PaymentProvider + ?Sized> PaymentProvider for Arc<P> {
    async fn create_intent(&self, reference: &str, amount: Money) -> Result<PaymentIntent> {
        (**self).create_intent(reference, amount).await
    }

    async fn capture(&self, intent_id: &str) -> Result<CaptureOutcome> {
        (**self).capture(intent_id).await
    }
}
