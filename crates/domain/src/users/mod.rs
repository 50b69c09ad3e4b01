//! User accounts.

mod model;
mod password;
mod service;

pub use model::{RegisterUser, User};
pub use password::{hash_password, verify_password};
pub use service::UserService;

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::UserId;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    UserNotFound(UserId),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl UserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UserError::UserNotFound(_) => ErrorKind::NotFound,
            UserError::EmailTaken => ErrorKind::Conflict,
            UserError::InvalidCredentials => ErrorKind::Unauthorized,
            UserError::InvalidRegistration(_) => ErrorKind::Validation,
            UserError::PasswordHash(_) => ErrorKind::Internal,
        }
    }
}
