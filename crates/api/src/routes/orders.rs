//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use document_store::DocumentStore;
use domain::{Order, OrderId, OrderStatus, ShippingAddress};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, Form, parse_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// POST /order/create with the shipping fields as body.
#[tracing::instrument(skip(state, address))]
pub async fn create<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    ApiJson(address): ApiJson<ShippingAddress>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state
        .orders
        .create_order(&principal, principal.user_id, address)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /order lists the caller's orders.
#[tracing::instrument(skip(state))]
pub async fn list<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(
        state.orders.list_orders(&principal, principal.user_id).await?,
    ))
}

/// GET /order/{id}
#[tracing::instrument(skip(state))]
pub async fn get<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.orders.get_order(&principal, order_id).await?))
}

/// DELETE /order/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    state.orders.delete_order(&principal, order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /order/{id}/attachments with one `file` part.
#[tracing::instrument(skip(state, multipart))]
pub async fn attach<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let file = Form::read(multipart)
        .await?
        .take_file("file")
        .ok_or_else(|| ApiError::BadRequest("file is required".into()))?;

    let order = state
        .orders
        .attach_asset(&principal, order_id, file)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// PATCH /order/{id}/status
#[tracing::instrument(skip(state))]
pub async fn update_status<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown status: {}", req.status)))?;
    let order = state
        .orders
        .advance_status(&principal, order_id, status)
        .await?;
    Ok(Json(order))
}
