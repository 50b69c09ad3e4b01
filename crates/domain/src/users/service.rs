//! Account registration and login.

use std::collections::HashSet;

use chrono::Utc;
use document_store::DocumentStore;

use super::model::normalize_email;
use super::{RegisterUser, User, UserError, hash_password, verify_password};
use crate::access::Role;
use crate::error::DomainError;
use crate::repository::Repository;
use crate::value_objects::UserId;

/// Service for user accounts.
pub struct UserService<S: DocumentStore> {
    users: Repository<S, User>,
    admin_emails: HashSet<String>,
}

impl<S: DocumentStore> UserService<S> {
    /// Creates a new user service.
    pub fn new(store: S) -> Self {
        Self {
            users: Repository::new(store),
            admin_emails: HashSet::new(),
        }
    }

    /// Accounts registered with one of these emails become admins.
    pub fn with_admin_emails<I>(mut self, emails: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.admin_emails = emails
            .into_iter()
            .map(|e| normalize_email(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let query = self.users.query().field_eq("email", email);
        Ok(self.users.find_one(query).await?.map(|stored| stored.entity))
    }

    /// Creates an account.
    // Email uniqueness is checked before the insert, not enforced by the store.
    #[tracing::instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: RegisterUser) -> Result<User, DomainError> {
        registration.validate()?;

        let email = normalize_email(&registration.email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(UserError::EmailTaken.into());
        }

        let role = if self.admin_emails.contains(&email) {
            Role::Admin
        } else {
            registration.role.unwrap_or_default()
        };

        let user = User {
            id: UserId::new(),
            name: registration.name.trim().to_string(),
            email,
            password_hash: hash_password(&registration.password)?,
            role,
            created_at: Utc::now(),
        };
        let stored = self.users.insert(user).await?;

        tracing::info!(user_id = %stored.entity.id, role = %stored.entity.role, "user registered");
        Ok(stored.entity)
    }

    /// Checks credentials and returns the account.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, DomainError> {
        let user = self
            .find_by_email(&normalize_email(email))
            .await?
            .filter(|user| verify_password(password, &user.password_hash))
            .ok_or(UserError::InvalidCredentials)?;

        tracing::debug!(user_id = %user.id, "login succeeded");
        Ok(user)
    }

    /// Loads an account by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, user_id: UserId) -> Result<User, DomainError> {
        self.users
            .load(user_id.document_id())
            .await?
            .map(|stored| stored.entity)
            .ok_or_else(|| UserError::UserNotFound(user_id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use document_store::InMemoryDocumentStore;

    fn registration(email: &str) -> RegisterUser {
        RegisterUser {
            name: "Linus".into(),
            email: email.into(),
            password: "penguin42".into(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let service = UserService::new(InMemoryDocumentStore::new());
        let user = service
            .register(registration("Linus@Example.com"))
            .await
            .unwrap();
        assert_eq!(user.email, "linus@example.com");
        assert_eq!(user.role, Role::User);
        assert_ne!(user.password_hash, "penguin42");

        let logged_in = service.login("linus@example.com ", "penguin42").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(service.get_user(user.id).await.unwrap().name, "Linus");
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let service = UserService::new(InMemoryDocumentStore::new());
        service.register(registration("a@b.c")).await.unwrap();

        let err = service.register(registration("A@B.C")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let service = UserService::new(InMemoryDocumentStore::new());
        service.register(registration("a@b.c")).await.unwrap();

        let wrong_password = service.login("a@b.c", "nope").await.unwrap_err();
        let unknown_email = service.login("x@y.z", "penguin42").await.unwrap_err();
        assert_eq!(wrong_password.kind(), ErrorKind::Unauthorized);
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_roles() {
        let service = UserService::new(InMemoryDocumentStore::new())
            .with_admin_emails(["Boss@Shop.io"]);

        let mut seller = registration("seller@shop.io");
        seller.role = Some(Role::Seller);
        assert_eq!(service.register(seller).await.unwrap().role, Role::Seller);

        let admin = service.register(registration("boss@shop.io")).await.unwrap();
        assert_eq!(admin.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let service = UserService::new(InMemoryDocumentStore::new());
        let err = service.get_user(UserId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
