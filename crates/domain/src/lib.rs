//! Domain layer for the storefront backend.
//!
//! This crate provides:
//! - Entity and Repository abstractions over the document store, with
//!   conditional read-modify-write for per-document atomicity
//! - Catalog (categories, products, reviews, images)
//! - Cart engine with stock checks and snapshot pricing
//! - Order materialization and the order status state machine
//! - User accounts and the capability check used by every mutation

pub mod access;
pub mod assets;
pub mod cart;
pub mod catalog;
pub mod entity;
pub mod error;
pub mod order;
pub mod repository;
pub mod users;
pub mod value_objects;

pub use access::{AccessError, Capability, Principal, Role, authorize};
pub use assets::{
    ASSET_ROUTE, AssetError, AssetStore, FileSystemAssetStore, InMemoryAssetStore, MAX_ASSET_BYTES,
    StoredAsset, Upload,
};
pub use cart::{Cart, CartError, CartService};
pub use catalog::{
    CatalogError, CatalogService, Category, MAX_PRICE_CENTS, MAX_PRODUCT_IMAGES, MAX_STOCK,
    NewProduct, Product, ProductFilter, Review,
};
pub use entity::Entity;
pub use error::{DomainError, ErrorKind};
pub use order::{
    Order, OrderError, OrderService, OrderStatus, PaymentTransition, SHIPPING_FIELDS,
    ShippingAddress,
};
pub use repository::{Change, Committed, Repository, Stored};
pub use users::{RegisterUser, User, UserError, UserService};
pub use value_objects::{CategoryId, LineItem, Money, OrderId, ProductId, UserId};
