//! Role and ownership checks.
//!
//! Every domain operation that acts on behalf of a caller goes through
//! [`authorize`]; routes never inspect roles themselves.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_objects::UserId;

/// Role attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Seller,
    Admin,
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            other => Err(AccessError::UnknownRole(other.to_string())),
        }
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Something a caller may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ManageCart,
    PlaceOrder,
    PayOrder,
    ViewOrder,
    DeleteOrder,
    FulfillOrder,
    ManageCatalog,
    ManageCategories,
    ReviewProduct,
}

impl Capability {
    /// Returns true if the caller's role may use this capability at all.
    fn role_allows(&self, role: Role) -> bool {
        match self {
            Capability::ManageCatalog => matches!(role, Role::Seller | Role::Admin),
            Capability::FulfillOrder | Capability::ManageCategories => role == Role::Admin,
            _ => true,
        }
    }

    /// Returns true if an admin may act on resources owned by someone else.
    fn admin_overrides_ownership(&self) -> bool {
        matches!(
            self,
            Capability::ViewOrder
                | Capability::DeleteOrder
                | Capability::FulfillOrder
                | Capability::ManageCatalog
        )
    }
}

/// Access control failures.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Forbidden")]
    Forbidden {
        capability: Capability,
        user_id: UserId,
    },

    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

/// Checks that `principal` may use `capability` on a resource owned by
/// `owner` (None for resources without an owner, such as a new product).
pub fn authorize(
    principal: &Principal,
    capability: Capability,
    owner: Option<UserId>,
) -> Result<(), AccessError> {
    let owns = match owner {
        Some(owner) => owner == principal.user_id,
        None => true,
    };
    let allowed = capability.role_allows(principal.role)
        && (owns || (principal.is_admin() && capability.admin_overrides_ownership()));

    if allowed {
        Ok(())
    } else {
        tracing::debug!(user_id = %principal.user_id, ?capability, "access denied");
        Err(AccessError::Forbidden {
            capability,
            user_id: principal.user_id,
        })
    }
}
