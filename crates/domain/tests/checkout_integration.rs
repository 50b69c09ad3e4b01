//! Integration tests for the cart-to-order pipeline.
//!
//! These tests drive the catalog, cart and order services together over a
//! shared in-memory document store.

use std::sync::Arc;

use document_store::InMemoryDocumentStore;
use domain::{
    CartService, CatalogService, CategoryId, DomainError, ErrorKind, InMemoryAssetStore, Money,
    NewProduct, OrderService, OrderStatus, Principal, Product, Role, ShippingAddress, Upload,
    UserId,
};

struct TestHarness {
    catalog: CatalogService<InMemoryDocumentStore>,
    carts: Arc<CartService<InMemoryDocumentStore>>,
    orders: OrderService<InMemoryDocumentStore>,
    seller: Principal,
    buyer: Principal,
}

impl TestHarness {
    async fn new() -> Self {
        let store = InMemoryDocumentStore::new();
        let assets = Arc::new(InMemoryAssetStore::default());
        let catalog = CatalogService::new(store.clone(), assets.clone());
        let admin = Principal::new(UserId::new(), Role::Admin);
        catalog
            .create_category(&admin, "General", Some(Upload::new(vec![1], "image/png")))
            .await
            .unwrap();
        Self {
            catalog,
            carts: Arc::new(CartService::new(store.clone())),
            orders: OrderService::new(store, assets),
            seller: Principal::new(UserId::new(), Role::Seller),
            buyer: Principal::new(UserId::new(), Role::User),
        }
    }

    async fn product(&self, title: &str, price_cents: i64, stock: u32) -> Product {
        self.catalog
            .create_product(
                &self.seller,
                NewProduct {
                    title: title.into(),
                    description: format!(
                        "{title}: a product description that is comfortably longer than fifty characters."
                    ),
                    category: CategoryId::for_name("general"),
                    price: Money::from_cents(price_cents),
                    stock,
                },
                Vec::new(),
            )
            .await
            .unwrap()
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            first_name: "Margaret".into(),
            last_name: "Hamilton".into(),
            email: "margaret@example.com".into(),
            phone: "555-0100".into(),
            address: "1 Apollo Way".into(),
            city: "Cambridge".into(),
            state: "MA".into(),
            country: "US".into(),
            zip: "02139".into(),
        }
    }
}

mod cart_engine {
    use super::*;

    #[tokio::test]
    async fn add_then_over_add_scenario() {
        let h = TestHarness::new().await;
        let x = h.product("Product X", 1999, 5).await;
        let me = h.buyer.user_id;

        let cart = h.carts.add_item(&h.buyer, me, x.id, 2).await.unwrap();
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.total_price(), x.price.checked_mul(2).unwrap());

        let err = h.carts.add_item(&h.buyer, me, x.id, 4).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let cart = h.carts.get_cart(&h.buyer, me).await.unwrap();
        assert_eq!(cart.total_items(), 2);
    }

    #[tokio::test]
    async fn restock_allows_further_increase() {
        let h = TestHarness::new().await;
        let x = h.product("Product X", 1000, 5).await;
        let me = h.buyer.user_id;
        h.carts.add_item(&h.buyer, me, x.id, 1).await.unwrap();

        // 1 + 4 reaches the stock of 5 exactly, which increase refuses.
        let err = h.carts.increase_item(&h.buyer, me, x.id, 4).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        h.catalog.update_stock(&h.seller, x.id, 50).await.unwrap();
        let cart = h.carts.increase_item(&h.buyer, me, x.id, 4).await.unwrap();
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_price().cents(), 5000);
    }

    #[tokio::test]
    async fn totals_follow_lines_through_every_operation() {
        let h = TestHarness::new().await;
        let a = h.product("A", 250, 20).await;
        let b = h.product("B", 1399, 20).await;
        let me = h.buyer.user_id;

        h.carts.add_item(&h.buyer, me, a.id, 3).await.unwrap();
        h.carts.add_item(&h.buyer, me, b.id, 1).await.unwrap();
        h.carts.increase_item(&h.buyer, me, b.id, 5).await.unwrap();
        h.carts.decrease_item(&h.buyer, me, a.id, 1).await.unwrap();
        let cart = h.carts.decrease_item(&h.buyer, me, a.id, 10).await.unwrap();

        assert_eq!(cart.lines().len(), 1);
        let items: u32 = cart.lines().iter().map(|l| l.quantity).sum();
        let price: i64 = cart
            .lines()
            .iter()
            .map(|l| l.line_total().unwrap().cents())
            .sum();
        assert_eq!(cart.total_items(), items);
        assert_eq!(cart.total_price(), Money::from_cents(price));
        assert_eq!(cart.total_price().cents(), 6 * 1399);

        let removed = h.carts.remove_item(&h.buyer, me, b.id).await.unwrap();
        assert!(removed.is_none());
        let err = h.carts.get_cart(&h.buyer, me).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_lose_no_updates() {
        let h = TestHarness::new().await;
        let product_id = h.product("Popular", 100, 100).await.id;
        let me = h.buyer.user_id;
        let buyer = h.buyer;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let carts = h.carts.clone();
            handles.push(tokio::spawn(async move {
                carts.add_item(&buyer, me, product_id, 1).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let cart = h.carts.get_cart(&h.buyer, me).await.unwrap();
        assert_eq!(cart.total_items(), 8);
        assert_eq!(cart.lines().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_never_exceed_stock() {
        let h = TestHarness::new().await;
        let product_id = h.product("Scarce", 100, 5).await.id;
        let me = h.buyer.user_id;
        let buyer = h.buyer;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let carts = h.carts.clone();
            handles.push(tokio::spawn(async move {
                carts.add_item(&buyer, me, product_id, 2).await
            }));
        }
        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => assert_eq!(e.kind(), ErrorKind::InsufficientStock),
            }
        }

        assert_eq!(accepted, 2);
        let cart = h.carts.get_cart(&h.buyer, me).await.unwrap();
        assert_eq!(cart.total_items(), 4);
    }
}

mod order_materializer {
    use super::*;

    #[tokio::test]
    async fn order_copies_two_line_cart() {
        let h = TestHarness::new().await;
        let a = h.product("A", 500, 5).await;
        let b = h.product("B", 750, 5).await;
        let me = h.buyer.user_id;
        h.carts.add_item(&h.buyer, me, a.id, 1).await.unwrap();
        let cart = h.carts.add_item(&h.buyer, me, b.id, 2).await.unwrap();

        let order = h
            .orders
            .create_order(&h.buyer, me, TestHarness::address())
            .await
            .unwrap();

        assert_eq!(order.lines().len(), 2);
        assert_eq!(order.total_price(), cart.total_price());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.status().to_string(), "Pending");

        // The cart survives until payment.
        assert!(h.carts.get_cart(&h.buyer, me).await.is_ok());
    }

    #[tokio::test]
    async fn missing_field_creates_no_order() {
        let h = TestHarness::new().await;
        let a = h.product("A", 500, 5).await;
        let me = h.buyer.user_id;
        h.carts.add_item(&h.buyer, me, a.id, 1).await.unwrap();

        let mut address = TestHarness::address();
        address.phone = "   ".into();
        address.city.clear();
        let err = h
            .orders
            .create_order(&h.buyer, me, address)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Order(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Missing required fields: phone, city");

        assert!(h.orders.list_orders(&h.buyer, me).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn retrying_checkout_creates_independent_orders() {
        let h = TestHarness::new().await;
        let a = h.product("A", 500, 5).await;
        let me = h.buyer.user_id;
        h.carts.add_item(&h.buyer, me, a.id, 1).await.unwrap();

        let first = h
            .orders
            .create_order(&h.buyer, me, TestHarness::address())
            .await
            .unwrap();
        h.carts.increase_item(&h.buyer, me, a.id, 1).await.unwrap();
        let second = h
            .orders
            .create_order(&h.buyer, me, TestHarness::address())
            .await
            .unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(first.total_items(), 1);
        assert_eq!(second.total_items(), 2);
        assert_eq!(h.orders.list_orders(&h.buyer, me).await.unwrap().len(), 2);
    }
}
