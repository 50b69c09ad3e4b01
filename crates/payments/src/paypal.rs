//! PayPal Orders v2 REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::Money;
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::error::{PaymentError, Result};
use crate::provider::{CaptureOutcome, PaymentIntent, PaymentProvider};
use crate::token::{AccessTokenProvider, ClientCredentialsTokenProvider};

/// Settings for talking to PayPal.
#[derive(Debug, Clone)]
pub struct PayPalConfig {
    /// API root, e.g. `https://api-m.sandbox.paypal.com`.
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// ISO 4217 code used for every intent.
    pub currency: String,
    /// Upper bound for each HTTP call, token exchange included.
    pub timeout: Duration,
}

/// Payment provider backed by the PayPal Orders API.
pub struct PayPalClient {
    http: reqwest::Client,
    base_url: String,
    currency: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl PayPalClient {
    /// Creates a client that authenticates with the given token provider.
    pub fn new(
        base_url: &str,
        currency: impl Into<String>,
        timeout: Duration,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            currency: currency.into(),
            tokens,
        })
    }

    /// Creates a client that obtains tokens through the client-credentials
    /// exchange, sharing one HTTP connection pool.
    pub fn from_config(config: &PayPalConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let tokens = Arc::new(ClientCredentialsTokenProvider::new(
            http.clone(),
            &config.base_url,
            config.client_id.clone(),
            config.client_secret.clone(),
        ));
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
            tokens,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, Value)> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    async fn post(&self, path: &str, body: Option<&Value>) -> Result<(StatusCode, Value)> {
        let request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        let request = match body {
            Some(body) => request.json(body),
            None => request.body("{}"),
        };
        self.send(request).await
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.send(self.http.get(format!("{}{}", self.base_url, path)))
            .await
    }

    /// Reads the capture result of an order the provider reports as
    /// already captured, e.g. when an earlier response was lost.
    async fn fetch_capture(&self, intent_id: &str) -> Result<CaptureOutcome> {
        let (status, body) = self
            .get(&format!("/v2/checkout/orders/{intent_id}"))
            .await?;
        if !status.is_success() {
            let name = error_name(status, &body);
            return Err(PaymentError::ExternalService(format!(
                "order lookup failed: {name}"
            )));
        }
        parse_capture(&body)
    }
}

/// Request body for creating a captured-on-approval order.
pub(crate) fn create_order_body(reference: &str, amount: Money, currency: &str) -> Value {
    json!({
        "intent": "CAPTURE",
        "purchase_units": [{
            "reference_id": reference,
            "amount": {
                "currency_code": currency,
                "value": amount.to_decimal_string(),
            }
        }]
    })
}

/// Extracts status and capture id from a capture response.
pub(crate) fn parse_capture(body: &Value) -> Result<CaptureOutcome> {
    let status = body["status"]
        .as_str()
        .ok_or_else(|| PaymentError::ExternalService("capture response has no status".into()))?;
    let capture_id = body["purchase_units"]
        .as_array()
        .into_iter()
        .flatten()
        .flat_map(|unit| unit["payments"]["captures"].as_array().into_iter().flatten())
        .find_map(|capture| capture["id"].as_str())
        .map(String::from);

    Ok(CaptureOutcome {
        status: status.to_string(),
        capture_id,
    })
}

/// Issue reported when capturing an order that is already captured.
const ORDER_ALREADY_CAPTURED: &str = "ORDER_ALREADY_CAPTURED";

/// Short description of an error response, e.g. `UNPROCESSABLE_ENTITY`.
fn error_name(status: StatusCode, body: &Value) -> String {
    body["details"][0]["issue"]
        .as_str()
        .or_else(|| body["name"].as_str())
        .map(String::from)
        .unwrap_or_else(|| status.as_str().to_string())
}

#[async_trait]
impl PaymentProvider for PayPalClient {
    #[tracing::instrument(skip(self), fields(amount = %amount))]
    async fn create_intent(&self, reference: &str, amount: Money) -> Result<PaymentIntent> {
        let body = create_order_body(reference, amount, &self.currency);
        let (status, body) = self.post("/v2/checkout/orders", Some(&body)).await?;

        if !status.is_success() {
            let name = error_name(status, &body);
            tracing::warn!(%status, error = %name, "create order rejected");
            return Err(PaymentError::ExternalService(format!(
                "create order failed: {name}"
            )));
        }

        let id = body["id"]
            .as_str()
            .ok_or_else(|| PaymentError::ExternalService("create order response has no id".into()))?;
        Ok(PaymentIntent {
            id: id.to_string(),
            status: body["status"].as_str().unwrap_or_default().to_string(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn capture(&self, intent_id: &str) -> Result<CaptureOutcome> {
        let path = format!("/v2/checkout/orders/{intent_id}/capture");
        let (status, body) = self.post(&path, None).await?;

        if status.is_success() {
            return parse_capture(&body);
        }

        let name = error_name(status, &body);
        if status == StatusCode::UNPROCESSABLE_ENTITY && name == ORDER_ALREADY_CAPTURED {
            tracing::info!(intent_id, "order already captured, reading capture result");
            return self.fetch_capture(intent_id).await;
        }

        tracing::warn!(%status, error = %name, "capture rejected");
        match status {
            // The provider judged the payment itself: declined, not approved,
            // unknown intent. That is an outcome, not a fault.
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::NOT_FOUND => {
                Err(PaymentError::PaymentFailed { status: name })
            }
            _ => Err(PaymentError::ExternalService(format!("capture failed: {name}"))),
        }
    }
}
