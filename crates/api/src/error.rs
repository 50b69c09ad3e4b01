//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind};
use payments::PaymentError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing, malformed or expired bearer token.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Nothing at this path.
    NotFound(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Payment reconciliation error.
    Payment(PaymentError),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized(_) => ErrorKind::Unauthorized,
            ApiError::BadRequest(_) => ErrorKind::Validation,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Domain(err) => err.kind(),
            ApiError::Payment(err) => err.kind(),
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::PaymentFailed => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        // Clients treat an out-of-stock add like a missing product.
        ErrorKind::NotFound | ErrorKind::InsufficientStock => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::ExternalService => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);

        let message = match self {
            ApiError::Unauthorized(msg) | ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg,
            ApiError::Domain(err) => err.to_string(),
            ApiError::Payment(err) => err.to_string(),
            ApiError::Internal(msg) => msg,
        };

        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!(error = %message, "internal server error");
                "Internal server error".to_string()
            }
            ErrorKind::ExternalService => {
                tracing::error!(error = %message, "payment provider failure");
                message
            }
            _ => message,
        };

        let body = serde_json::json!({ "error": message, "code": kind.code() });
        (status, axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Payment(err)
    }
}
