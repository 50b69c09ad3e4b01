//! Domain error types.

use document_store::DocumentStoreError;
use thiserror::Error;

use crate::access::AccessError;
use crate::assets::AssetError;
use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::order::OrderError;
use crate::users::UserError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error raised by the cart engine.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// An error raised by the order materializer.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// An error raised by the catalog.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// An error raised by user accounts.
    #[error(transparent)]
    User(#[from] UserError),

    /// The caller lacks the capability for the operation.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The asset store rejected or failed an operation.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Missing or malformed input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The conditional write kept losing races after all retries.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An error occurred in the document store.
    #[error("Store error: {0}")]
    Store(#[from] DocumentStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of errors, shared by every layer that needs to
/// turn an error into a client-facing outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    InsufficientStock,
    Conflict,
    Unauthorized,
    PaymentFailed,
    ExternalService,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code for clients to branch on.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::PaymentFailed => "payment_failed",
            ErrorKind::ExternalService => "external_service_error",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl DomainError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Cart(e) => e.kind(),
            DomainError::Order(e) => e.kind(),
            DomainError::Catalog(e) => e.kind(),
            DomainError::User(e) => e.kind(),
            DomainError::Access(_) => ErrorKind::Forbidden,
            DomainError::Asset(e) => e.kind(),
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::Store(_) | DomainError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }
}
