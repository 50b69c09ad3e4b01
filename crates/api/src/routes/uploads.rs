//! Serves stored uploads back to clients.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use document_store::DocumentStore;
use domain::DomainError;
use domain::assets::is_safe_name;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /uploads/{name}
#[tracing::instrument(skip(state))]
pub async fn serve<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let not_found = || ApiError::NotFound("File not found".into());
    if !is_safe_name(&name) {
        return Err(not_found());
    }

    let asset = state
        .assets
        .fetch(&name)
        .await
        .map_err(DomainError::from)?
        .ok_or_else(not_found)?;
    Ok((
        [
            (header::CONTENT_TYPE, asset.content_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        asset.bytes,
    ))
}
