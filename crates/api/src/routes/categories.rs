//! Category endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use document_store::DocumentStore;
use domain::{Category, CategoryId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{Form, parse_id};
use crate::state::AppState;

/// POST /categories as `multipart/form-data` with `name` and one `image`.
#[tracing::instrument(skip(state, multipart))]
pub async fn create<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let mut form = Form::read(multipart).await?;
    let name = form.text("name").unwrap_or_default().to_string();
    let image = form.take_file("image");

    let category = state
        .catalog
        .create_category(&principal, &name, image)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /categories
pub async fn list<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.catalog.list_categories().await?))
}

/// GET /categories/{id}
#[tracing::instrument(skip(state))]
pub async fn get<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(id): Path<String>,
) -> Result<Json<Category>, ApiError> {
    let category_id: CategoryId = parse_id(&id, "category")?;
    Ok(Json(state.catalog.get_category(category_id).await?))
}

/// DELETE /categories/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let category_id: CategoryId = parse_id(&id, "category")?;
    state
        .catalog
        .delete_category(&principal, category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
