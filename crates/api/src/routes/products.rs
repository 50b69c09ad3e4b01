//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use document_store::DocumentStore;
use domain::{CategoryId, Money, NewProduct, Product, ProductFilter, ProductId};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, Form, parse_id};
use crate::state::AppState;

/// Form field carrying product images.
const IMAGES_FIELD: &str = "images";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Deserialize)]
pub struct StockRequest {
    pub stock: u32,
}

/// Builds the product fields from a form. Price is in cents.
fn new_product(form: &Form) -> Result<NewProduct, ApiError> {
    let category = form
        .text("category")
        .ok_or_else(|| ApiError::BadRequest("category is required".into()))?;
    Ok(NewProduct {
        title: form.text("title").unwrap_or_default().to_string(),
        description: form.text("description").unwrap_or_default().to_string(),
        category: parse_id::<CategoryId>(category, "category")?,
        price: Money::from_cents(form.parse("price")?),
        stock: form.parse("stock")?,
    })
}

/// POST /products as `multipart/form-data`: text fields `title`,
/// `description`, `category`, `price`, `stock` and up to eight `images`.
#[tracing::instrument(skip(state, multipart))]
pub async fn create<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let mut form = Form::read(multipart).await?;
    let fields = new_product(&form)?;
    let images = form.take_files(IMAGES_FIELD);
    if let Some(field) = form.leftover_files().first() {
        return Err(ApiError::BadRequest(format!("Unexpected file field: {field}")));
    }

    let product = state
        .catalog
        .create_product(&principal, fields, images)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products, optionally narrowed to one category.
#[tracing::instrument(skip(state))]
pub async fn list<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let category = query
        .category
        .as_deref()
        .map(|raw| parse_id::<CategoryId>(raw, "category"))
        .transpose()?;
    let products = state
        .catalog
        .list_products(ProductFilter {
            category,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;
    Ok(Json(products))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    Ok(Json(state.catalog.get_product(product_id).await?))
}

/// POST /products/{id}/images with one `image` file part.
#[tracing::instrument(skip(state, multipart))]
pub async fn add_image<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let image = Form::read(multipart)
        .await?
        .take_file("image")
        .ok_or_else(|| ApiError::BadRequest("image is required".into()))?;

    let product = state
        .catalog
        .add_product_image(&principal, product_id, image)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// POST /products/{id}/reviews
#[tracing::instrument(skip(state, req))]
pub async fn add_review<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = state
        .catalog
        .add_review(&principal, product_id, req.rating, req.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /products/{id}/stock
#[tracing::instrument(skip(state, req))]
pub async fn update_stock<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StockRequest>,
) -> Result<Json<Product>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = state
        .catalog
        .update_stock(&principal, product_id, req.stock)
        .await?;
    Ok(Json(product))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    state.catalog.delete_product(&principal, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
