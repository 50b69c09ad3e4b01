use chrono::{DateTime, Utc};
use common::DocumentId;
use serde::{Deserialize, Serialize};

use super::UserError;
use crate::access::Role;
use crate::entity::Entity;
use crate::value_objects::UserId;

const MIN_NAME_CHARS: usize = 3;
const MIN_PASSWORD_CHARS: usize = 6;

/// Fields supplied at sign-up.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Requested role. Only `user` and `seller` can be self-assigned.
    #[serde(default)]
    pub role: Option<Role>,
}

impl RegisterUser {
    /// Checks field rules, returning every violation at once.
    pub fn validate(&self) -> Result<(), UserError> {
        let mut problems = Vec::new();
        if self.name.trim().chars().count() < MIN_NAME_CHARS {
            problems.push(format!("name must be at least {MIN_NAME_CHARS} characters"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            problems.push("email is invalid".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            problems.push(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            ));
        }
        if self.role == Some(Role::Admin) {
            problems.push("role must be user or seller".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(UserError::InvalidRegistration(problems.join(", ")))
        }
    }
}

/// A registered account.
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Lowercased at registration; unique across accounts.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Normalizes an email for storage and lookup.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Entity for User {
    fn collection() -> &'static str {
        "users"
    }

    fn document_id(&self) -> DocumentId {
        self.id.document_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegisterUser {
        RegisterUser {
            name: "Grace".into(),
            email: "grace@example.com".into(),
            password: "cobol1959".into(),
            role: None,
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn test_registration_rules() {
        let bad = RegisterUser {
            name: "Al".into(),
            email: "nobody".into(),
            password: "123".into(),
            role: Some(Role::Admin),
        };
        match bad.validate() {
            Err(UserError::InvalidRegistration(message)) => {
                assert!(message.contains("name"));
                assert!(message.contains("email"));
                assert!(message.contains("password"));
                assert!(message.contains("role"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_hides_password_hash() {
        let user = User {
            id: UserId::new(),
            name: "Grace".into(),
            email: "grace@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::User,
            created_at: Utc::now(),
        };
        assert!(!format!("{user:?}").contains("secret"));
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email("  Grace@Example.COM "), "grace@example.com");
    }
}
