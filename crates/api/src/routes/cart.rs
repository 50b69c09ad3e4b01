//! Cart endpoints. Every route acts on the caller's own cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use document_store::DocumentStore;
use domain::{Cart, ProductId};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, parse_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

/// POST /cart/{productId}
#[tracing::instrument(skip(state))]
pub async fn add<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(product_id): Path<String>,
    ApiJson(req): ApiJson<QuantityRequest>,
) -> Result<Json<Cart>, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let cart = state
        .carts
        .add_item(&principal, principal.user_id, product_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// GET /cart
#[tracing::instrument(skip(state))]
pub async fn get<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Cart>, ApiError> {
    Ok(Json(state.carts.get_cart(&principal, principal.user_id).await?))
}

/// PATCH /cart/increase/{productId}
#[tracing::instrument(skip(state))]
pub async fn increase<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(product_id): Path<String>,
    ApiJson(req): ApiJson<QuantityRequest>,
) -> Result<Json<Cart>, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let cart = state
        .carts
        .increase_item(&principal, principal.user_id, product_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// PATCH /cart/decrease/{productId}
#[tracing::instrument(skip(state))]
pub async fn decrease<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(product_id): Path<String>,
    ApiJson(req): ApiJson<QuantityRequest>,
) -> Result<Json<Cart>, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let cart = state
        .carts
        .decrease_item(&principal, principal.user_id, product_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// PATCH /cart/delete/{productId}
///
/// Responds with `null` once the last line is gone and the cart deleted.
#[tracing::instrument(skip(state))]
pub async fn remove<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<Option<Cart>>, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let cart = state
        .carts
        .remove_item(&principal, principal.user_id, product_id)
        .await?;
    Ok(Json(cart))
}
