//! In-memory payment provider for tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::Money;

use crate::error::{PaymentError, Result};
use crate::provider::{CAPTURE_COMPLETED, CaptureOutcome, PaymentIntent, PaymentProvider};

#[derive(Debug)]
struct Intent {
    reference: String,
    amount: Money,
    capture: Option<CaptureOutcome>,
}

#[derive(Debug)]
struct InMemoryPaymentState {
    intents: HashMap<String, Intent>,
    next_id: u32,
    capture_status: String,
    fail_on_create: bool,
    fail_on_capture: bool,
    lose_capture_response: bool,
    capture_calls: usize,
}

impl Default for InMemoryPaymentState {
    fn default() -> Self {
        Self {
            intents: HashMap::new(),
            next_id: 0,
            capture_status: CAPTURE_COMPLETED.to_string(),
            fail_on_create: false,
            fail_on_capture: false,
            lose_capture_response: false,
            capture_calls: 0,
        }
    }
}

/// Payment provider that approves everything unless told otherwise.
///
/// Intent ids look like `INTENT-0001`, capture ids like `CAPTURE-0001`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentProvider {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

fn poisoned<T>(_: T) -> PaymentError {
    PaymentError::ExternalService("payment state lock poisoned".into())
}

impl InMemoryPaymentProvider {
    /// Creates a new in-memory provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Status reported by subsequent captures, e.g. `"DECLINED"`.
    pub fn set_capture_status(&self, status: impl Into<String>) {
        if let Ok(mut state) = self.state.write() {
            state.capture_status = status.into();
        }
    }

    /// Makes intent creation behave as if the provider were unreachable.
    pub fn set_fail_on_create(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail_on_create = fail;
        }
    }

    /// Makes capture behave as if the provider were unreachable.
    pub fn set_fail_on_capture(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail_on_capture = fail;
        }
    }

    /// Makes capture take the money but fail as if the response timed out.
    pub fn set_lose_capture_response(&self, lose: bool) {
        if let Ok(mut state) = self.state.write() {
            state.lose_capture_response = lose;
        }
    }

    /// Number of capture requests received, failed ones included.
    pub fn capture_calls(&self) -> usize {
        self.state.read().map(|s| s.capture_calls).unwrap_or(0)
    }

    /// Amount and reference an intent was created with.
    pub fn intent(&self, intent_id: &str) -> Option<(String, Money)> {
        let state = self.state.read().ok()?;
        state
            .intents
            .get(intent_id)
            .map(|intent| (intent.reference.clone(), intent.amount))
    }

    /// Number of intents created.
    pub fn intent_count(&self) -> usize {
        self.state.read().map(|s| s.intents.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PaymentProvider for InMemoryPaymentProvider {
    async fn create_intent(&self, reference: &str, amount: Money) -> Result<PaymentIntent> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.fail_on_create {
            return Err(PaymentError::ExternalService("provider unavailable".into()));
        }

        state.next_id += 1;
        let id = format!("INTENT-{:04}", state.next_id);
        state.intents.insert(
            id.clone(),
            Intent {
                reference: reference.to_string(),
                amount,
                capture: None,
            },
        );

        Ok(PaymentIntent {
            id,
            status: "CREATED".into(),
        })
    }

    async fn capture(&self, intent_id: &str) -> Result<CaptureOutcome> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.capture_calls += 1;
        if state.fail_on_capture {
            return Err(PaymentError::ExternalService("provider unavailable".into()));
        }

        let status = state.capture_status.clone();
        let lose_response = state.lose_capture_response;
        let intent = state
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| PaymentError::PaymentFailed {
                status: "RESOURCE_NOT_FOUND".into(),
            })?;

        // A completed capture is final; asking again returns the same result.
        if let Some(done) = intent.capture.as_ref().filter(|c| c.is_completed()) {
            return Ok(done.clone());
        }

        let outcome = CaptureOutcome {
            capture_id: (status == CAPTURE_COMPLETED)
                .then(|| intent_id.replacen("INTENT", "CAPTURE", 1)),
            status,
        };
        intent.capture = Some(outcome.clone());
        if lose_response {
            return Err(PaymentError::ExternalService("capture response timed out".into()));
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_capture() {
        let provider = InMemoryPaymentProvider::new();
        let intent = provider
            .create_intent("order-1", Money::from_cents(5000))
            .await
            .unwrap();
        assert_eq!(intent.id, "INTENT-0001");
        assert_eq!(
            provider.intent(&intent.id),
            Some(("order-1".to_string(), Money::from_cents(5000)))
        );

        let outcome = provider.capture(&intent.id).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(outcome.capture_id.as_deref(), Some("CAPTURE-0001"));

        let again = provider.capture(&intent.id).await.unwrap();
        assert_eq!(again, outcome);
        assert_eq!(provider.capture_calls(), 2);
    }

    #[tokio::test]
    async fn test_declined_capture() {
        let provider = InMemoryPaymentProvider::new();
        provider.set_capture_status("DECLINED");
        let intent = provider
            .create_intent("order-1", Money::from_cents(100))
            .await
            .unwrap();

        let outcome = provider.capture(&intent.id).await.unwrap();
        assert!(!outcome.is_completed());
        assert!(outcome.capture_id.is_none());
    }

    #[tokio::test]
    async fn test_lost_response_still_captures() {
        let provider = InMemoryPaymentProvider::new();
        provider.set_lose_capture_response(true);
        let intent = provider
            .create_intent("order-1", Money::from_cents(100))
            .await
            .unwrap();

        let err = provider.capture(&intent.id).await.unwrap_err();
        assert!(matches!(err, PaymentError::ExternalService(_)));

        provider.set_lose_capture_response(false);
        let outcome = provider.capture(&intent.id).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(outcome.capture_id.as_deref(), Some("CAPTURE-0001"));
    }

    #[tokio::test]
    async fn test_unknown_intent_and_outage() {
        let provider = InMemoryPaymentProvider::new();
        let err = provider.capture("INTENT-9999").await.unwrap_err();
        assert!(matches!(err, PaymentError::PaymentFailed { .. }));

        provider.set_fail_on_create(true);
        let err = provider
            .create_intent("order-1", Money::from_cents(100))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::ExternalService(_)));
        assert_eq!(provider.intent_count(), 0);
    }
}
