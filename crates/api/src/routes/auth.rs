//! Registration, login and profile endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use document_store::DocumentStore;
use domain::{RegisterUser, Role, User, UserId};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account fields safe to return to clients.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

/// POST /auth/register
#[tracing::instrument(skip_all)]
pub async fn register<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    ApiJson(req): ApiJson<RegisterUser>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let user = state.users.register(req).await?;
    let token = state.jwt.issue(&user)?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// POST /auth/login
#[tracing::instrument(skip_all)]
pub async fn login<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("email and password are required".into()));
    }
    let user = state.users.login(&req.email, &req.password).await?;
    let token = state.jwt.issue(&user)?;
    Ok(Json(SessionResponse {
        token,
        user: user.into(),
    }))
}

/// GET /auth/profile
#[tracing::instrument(skip_all)]
pub async fn profile<D: DocumentStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.get_user(principal.user_id).await?;
    Ok(Json(user.into()))
}
