//! Value objects shared by the catalog, cart and order modules.

use common::DocumentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! document_id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(DocumentId);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(DocumentId::new())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(DocumentId::from_uuid(uuid))
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0.as_uuid()
            }

            /// Returns the key of the document this identifier names.
            pub fn document_id(&self) -> DocumentId {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<DocumentId>().map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self::from_uuid(uuid)
            }
        }

        impl From<DocumentId> for $name {
            fn from(id: DocumentId) -> Self {
                Self(id)
            }
        }

        impl From<$name> for DocumentId {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

document_id_newtype!(
    /// Unique identifier for a user account. Also keys the user's cart.
    UserId
);

document_id_newtype!(
    /// Unique identifier for a catalog product.
    ProductId
);

document_id_newtype!(
    /// Unique identifier for an order.
    OrderId
);

document_id_newtype!(
    /// Unique identifier for a product category.
    CategoryId
);

impl CategoryId {
    /// Derives the identifier from a category name.
    ///
    /// Names that differ only in case or surrounding whitespace map to the
    /// same id, so a second category with the same name collides on insert.
    pub fn for_name(name: &str) -> Self {
        let key = name.trim().to_lowercase();
        Self::from_uuid(Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("category:{key}").as_bytes()))
    }
}

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, or None if the result doesn't fit.
    pub fn checked_mul(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds two amounts, or None if the result doesn't fit.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }

    /// Renders the amount as a two-decimal fixed-point string without a
    /// currency symbol, the format payment providers expect (`1234` → `"12.34"`).
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.cents < 0 { "-" } else { "" };
        format!("{sign}{}.{:02}", self.dollars().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

/// A product line in a cart or order.
///
/// Title, price and image are copied from the product when the line is
/// first added and never re-read from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The product identifier.
    pub product_id: ProductId,

    /// Product title at the time the line was added.
    pub title: String,

    /// First product image at the time the line was added.
    pub image: Option<String>,

    /// Quantity, always at least 1 while the line exists.
    pub quantity: u32,

    /// Price per unit in cents.
    pub unit_price: Money,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(
        product_id: ProductId,
        title: impl Into<String>,
        image: Option<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            title: title.into(),
            image,
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this line (quantity * unit_price), or
    /// None if it overflows.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_parse() {
        let a = ProductId::new();
        let b = ProductId::new();
        assert_ne!(a, b);

        let parsed: ProductId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
        assert!("not-a-uuid".parse::<OrderId>().is_err());
    }

    #[test]
    fn test_user_id_keys_document() {
        let uuid = Uuid::new_v4();
        let id = UserId::from_uuid(uuid);
        assert_eq!(id.document_id().as_uuid(), uuid);
    }

    #[test]
    fn test_category_id_follows_name() {
        assert_eq!(CategoryId::for_name("Kitchen"), CategoryId::for_name("  kitchen "));
        assert_ne!(CategoryId::for_name("kitchen"), CategoryId::for_name("garden"));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_decimal_string() {
        assert_eq!(Money::from_cents(1234).to_decimal_string(), "12.34");
        assert_eq!(Money::from_cents(100).to_decimal_string(), "1.00");
        assert_eq!(Money::from_cents(7).to_decimal_string(), "0.07");
        assert_eq!(Money::zero().to_decimal_string(), "0.00");
        assert_eq!(Money::from_cents(-250).to_decimal_string(), "-2.50");
    }

    #[test]
    fn test_money_serializes_as_cents() {
        let json = serde_json::to_value(Money::from_cents(300)).unwrap();
        assert_eq!(json, serde_json::json!(300));
    }

    #[test]
    fn test_money_checked_arithmetic() {
        let a = Money::from_cents(250);
        assert_eq!(a.checked_add(Money::from_cents(105)), Some(Money::from_cents(355)));
        assert_eq!(a.checked_mul(4), Some(Money::from_cents(1000)));

        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.checked_mul(3), None);
        assert_eq!(huge.checked_add(huge).map(|m| m.cents()), Some(i64::MAX - 1));
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
    }

    #[test]
    fn test_line_total() {
        let line = LineItem::new(ProductId::new(), "Widget", None, 3, Money::from_cents(1000));
        assert_eq!(line.line_total(), Some(Money::from_cents(3000)));

        let line = LineItem::new(ProductId::new(), "Yacht", None, u32::MAX, Money::from_cents(i64::MAX / 2));
        assert_eq!(line.line_total(), None);
    }
}
