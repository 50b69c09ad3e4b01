//! HTTP handlers, one module per resource.

pub mod auth;
pub mod cart;
pub mod categories;
pub mod ops;
pub mod orders;
pub mod payments;
pub mod products;
pub mod uploads;
