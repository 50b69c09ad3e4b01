//! PayPal checkout endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use document_store::DocumentStore;
use domain::{Money, OrderId, OrderStatus};
use payments::IntentCreated;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub paypal_order_id: Option<String>,
    pub order_id: Option<String>,
}

/// Summary of the order after a capture.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub payment_id: Option<String>,
    pub total_price: Money,
    /// True if this request did not change the order.
    pub already_paid: bool,
}

/// POST /order/paypal/create-order
#[tracing::instrument(skip(state))]
pub async fn create_intent<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    ApiJson(req): ApiJson<CreateIntentRequest>,
) -> Result<Json<IntentCreated>, ApiError> {
    let created = state
        .payments
        .create_payment_intent(&principal, req.order_id.as_deref())
        .await?;
    Ok(Json(created))
}

/// POST /order/paypal/capture-order
#[tracing::instrument(skip(state))]
pub async fn capture<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    ApiJson(req): ApiJson<CaptureRequest>,
) -> Result<Json<CaptureResponse>, ApiError> {
    let result = state
        .payments
        .capture_payment(
            &principal,
            req.paypal_order_id.as_deref(),
            req.order_id.as_deref(),
        )
        .await?;

    let order = result.order;
    Ok(Json(CaptureResponse {
        order_id: order.id(),
        status: order.status(),
        payment_id: order.payment_id().map(String::from),
        total_price: order.total_price(),
        already_paid: !result.applied,
    }))
}
