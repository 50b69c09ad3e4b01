//! Shared application state.

use std::sync::Arc;

use document_store::DocumentStore;
use domain::{AssetStore, CartService, CatalogService, OrderService, UserService};
use payments::{PaymentProvider, PaymentReconciler};

use crate::auth::JwtService;

/// Provider handle shared by the reconciler.
pub type DynPaymentProvider = Arc<dyn PaymentProvider>;

/// Services accessible from all handlers.
pub struct AppState<D: DocumentStore> {
    pub users: UserService<D>,
    pub catalog: CatalogService<D>,
    pub carts: Arc<CartService<D>>,
    pub orders: Arc<OrderService<D>>,
    pub payments: PaymentReconciler<D, DynPaymentProvider>,
    pub assets: Arc<dyn AssetStore>,
    pub jwt: JwtService,
}

impl<D: DocumentStore + Clone> AppState<D> {
    /// Wires every service to one document store and asset store.
    pub fn new(
        store: D,
        assets: Arc<dyn AssetStore>,
        provider: DynPaymentProvider,
        jwt: JwtService,
        admin_emails: &[String],
    ) -> Self {
        let carts = Arc::new(CartService::new(store.clone()));
        let orders = Arc::new(OrderService::new(store.clone(), assets.clone()));
        Self {
            users: UserService::new(store.clone()).with_admin_emails(admin_emails),
            catalog: CatalogService::new(store, assets.clone()),
            payments: PaymentReconciler::new(orders.clone(), carts.clone(), provider),
            carts,
            orders,
            assets,
            jwt,
        }
    }
}
