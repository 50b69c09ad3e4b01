//! Payment error types.

use domain::{DomainError, ErrorKind};
use thiserror::Error;

/// Errors that can occur during payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The provider answered but did not complete the payment.
    #[error("Payment not completed: {status}")]
    PaymentFailed { status: String },

    /// The provider could not be reached or answered with a fault.
    #[error("Payment provider error: {0}")]
    ExternalService(String),

    /// Domain error.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl PaymentError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::PaymentFailed { .. } => ErrorKind::PaymentFailed,
            PaymentError::ExternalService(_) => ErrorKind::ExternalService,
            PaymentError::Domain(e) => e.kind(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        PaymentError::Domain(DomainError::validation(message))
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PaymentError::ExternalService("request timed out".to_string())
        } else {
            PaymentError::ExternalService(e.without_url().to_string())
        }
    }
}

/// Convenience type alias for payment results.
pub type Result<T> = std::result::Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let failed = PaymentError::PaymentFailed {
            status: "DECLINED".into(),
        };
        assert_eq!(failed.kind(), ErrorKind::PaymentFailed);
        assert_eq!(failed.to_string(), "Payment not completed: DECLINED");

        let down = PaymentError::ExternalService("connection refused".into());
        assert_eq!(down.kind(), ErrorKind::ExternalService);

        assert_eq!(PaymentError::validation("orderId is required").kind(), ErrorKind::Validation);
    }
}
