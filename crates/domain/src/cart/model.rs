use chrono::{DateTime, Utc};
use common::DocumentId;
use serde::{Deserialize, Serialize};

use super::CartError;
use crate::catalog::Product;
use crate::entity::Entity;
use crate::value_objects::{LineItem, Money, ProductId, UserId};

/// A user's shopping cart.
///
/// There is at most one cart per user and it is stored under the user's id.
/// `total_items` and `total_price` are derived: every mutation ends with a
/// full recomputation over the remaining lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    lines: Vec<LineItem>,
    total_items: u32,
    total_price: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            lines: Vec::new(),
            total_items: 0,
            total_price: Money::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the quantity of a product in the cart (0 if absent).
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.line(product_id).map(|l| l.quantity).unwrap_or(0)
    }

    fn line(&self, product_id: ProductId) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Adds `quantity` units of a product.
    ///
    /// An existing line is merged additively and keeps its original
    /// snapshot; a new line snapshots the product's title, price and first
    /// image. Fails if the resulting quantity exceeds the product's stock.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let requested = self.quantity_of(product.id).saturating_add(quantity);
        if requested > product.stock {
            return Err(CartError::InsufficientStock {
                product_id: product.id,
                requested,
                available: product.stock,
            });
        }

        let mut lines = self.lines.clone();
        match lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => line.quantity = requested,
            None => lines.push(LineItem::new(
                product.id,
                product.title.clone(),
                product.primary_image(),
                quantity,
                product.price,
            )),
        }

        self.replace_lines(lines)
    }

    /// Raises the quantity of an existing line by `delta`.
    ///
    /// Reaching exactly the available stock is rejected as well as
    /// exceeding it.
    pub fn increase(&mut self, product_id: ProductId, delta: u32, stock: u32) -> Result<(), CartError> {
        if delta == 0 {
            return Err(CartError::InvalidQuantity(delta));
        }

        let mut lines = self.lines.clone();
        let line = lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        let requested = line.quantity.saturating_add(delta);
        if requested >= stock {
            return Err(CartError::InsufficientStock {
                product_id,
                requested,
                available: stock,
            });
        }
        line.quantity = requested;

        self.replace_lines(lines)
    }

    /// Lowers the quantity of an existing line by `delta`, dropping the line
    /// when nothing would be left.
    pub fn decrease(&mut self, product_id: ProductId, delta: u32) -> Result<(), CartError> {
        if delta == 0 {
            return Err(CartError::InvalidQuantity(delta));
        }

        let mut lines = self.lines.clone();
        let line = lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        if delta >= line.quantity {
            lines.retain(|l| l.product_id != product_id);
        } else {
            line.quantity -= delta;
        }

        self.replace_lines(lines)
    }

    /// Removes the line for a product.
    pub fn remove(&mut self, product_id: ProductId) -> Result<(), CartError> {
        if self.line(product_id).is_none() {
            return Err(CartError::LineNotFound(product_id));
        }

        let lines = self
            .lines
            .iter()
            .filter(|l| l.product_id != product_id)
            .cloned()
            .collect();
        self.replace_lines(lines)
    }

    /// Installs new lines together with their recomputed totals. The cart is
    /// left as it was if the totals don't fit.
    fn replace_lines(&mut self, lines: Vec<LineItem>) -> Result<(), CartError> {
        let (total_items, total_price) = totals(&lines)?;
        self.lines = lines;
        self.total_items = total_items;
        self.total_price = total_price;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn totals(lines: &[LineItem]) -> Result<(u32, Money), CartError> {
    lines
        .iter()
        .try_fold((0u32, Money::zero()), |(items, price), line| {
            let items = items.checked_add(line.quantity)?;
            let price = price.checked_add(line.line_total()?)?;
            Some((items, price))
        })
        .ok_or(CartError::TotalTooLarge)
}

impl Entity for Cart {
    fn collection() -> &'static str {
        "carts"
    }

    fn document_id(&self) -> DocumentId {
        self.user_id.document_id()
    }
}
