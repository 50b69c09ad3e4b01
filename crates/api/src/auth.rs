//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs issued at register/login. Handlers that need a
//! caller take an [`AuthUser`], which validates the `Authorization` header
//! and yields the domain [`Principal`].

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use document_store::DocumentStore;
use domain::{Principal, Role, User, UserId};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Claims carried in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: Role,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates tokens.
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl JwtService {
    pub fn new(secret: &str, expiration_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            lifetime: Duration::minutes(expiration_minutes),
        }
    }

    /// Signs a token for the account.
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, ApiError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    /// Checks signature and expiry and returns the caller.
    pub fn validate(&self, token: &str) -> Result<Principal, ApiError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            match e.kind() {
                JwtErrorKind::ExpiredSignature => ApiError::Unauthorized("Token expired".into()),
                _ => ApiError::Unauthorized("Invalid token".into()),
            }
        })?;

        let user_id: UserId = data
            .claims
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("Invalid token".into()))?;
        Ok(Principal::new(user_id, data.claims.role))
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Principal);

impl<D: DocumentStore> FromRequestParts<Arc<AppState<D>>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<D>>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?;

        state.jwt.validate(token).map(AuthUser)
    }
}
