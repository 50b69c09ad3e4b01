//! HTTP API server for the storefront backend.
//!
//! Provides REST endpoints for accounts, the catalog, carts, orders and
//! PayPal checkout, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use document_store::DocumentStore;
use domain::{ASSET_ROUTE, FileSystemAssetStore, MAX_ASSET_BYTES, MAX_PRODUCT_IMAGES};
use metrics_exporter_prometheus::PrometheusHandle;
use payments::{InMemoryPaymentProvider, PayPalClient, PaymentError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::JwtService;
use config::Config;
use state::{AppState, DynPaymentProvider};

/// Room for multipart framing and text fields around the uploaded files.
const FORM_OVERHEAD: usize = 64 * 1024;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<D: DocumentStore + 'static>(
    state: Arc<AppState<D>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{auth, cart, categories, ops, orders, payments, products, uploads};

    let metrics_router = Router::new()
        .route("/metrics", get(ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(ops::health))
        .route("/auth/register", post(auth::register::<D>))
        .route("/auth/login", post(auth::login::<D>))
        .route("/auth/profile", get(auth::profile::<D>))
        .route(
            "/categories",
            post(categories::create::<D>).get(categories::list::<D>),
        )
        .route(
            "/categories/{id}",
            get(categories::get::<D>).delete(categories::delete::<D>),
        )
        .route(
            "/products",
            post(products::create::<D>)
                .layer(DefaultBodyLimit::max(
                    MAX_PRODUCT_IMAGES * MAX_ASSET_BYTES + FORM_OVERHEAD,
                ))
                .get(products::list::<D>),
        )
        .route(
            "/products/{id}",
            get(products::get::<D>).delete(products::delete::<D>),
        )
        .route("/products/{id}/images", post(products::add_image::<D>))
        .route("/products/{id}/reviews", post(products::add_review::<D>))
        .route("/products/{id}/stock", patch(products::update_stock::<D>))
        .route("/cart", get(cart::get::<D>))
        .route("/cart/{product_id}", post(cart::add::<D>))
        .route("/cart/increase/{product_id}", patch(cart::increase::<D>))
        .route("/cart/decrease/{product_id}", patch(cart::decrease::<D>))
        .route("/cart/delete/{product_id}", patch(cart::remove::<D>))
        .route("/order", get(orders::list::<D>))
        .route("/order/create", post(orders::create::<D>))
        .route(
            "/order/{id}",
            get(orders::get::<D>).delete(orders::delete::<D>),
        )
        .route("/order/{id}/attachments", post(orders::attach::<D>))
        .route("/order/{id}/status", patch(orders::update_status::<D>))
        .route(
            "/order/paypal/create-order",
            post(payments::create_intent::<D>),
        )
        .route("/order/paypal/capture-order", post(payments::capture::<D>))
        .route(&format!("{ASSET_ROUTE}/{{name}}"), get(uploads::serve::<D>))
        .with_state(state)
        .merge(metrics_router)
        .layer(DefaultBodyLimit::max(MAX_ASSET_BYTES + FORM_OVERHEAD))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Picks the payment provider: PayPal when credentials are configured,
/// otherwise the in-memory stand-in.
pub fn payment_provider(config: &Config) -> Result<DynPaymentProvider, PaymentError> {
    match &config.paypal {
        Some(paypal) => {
            tracing::info!(base_url = %paypal.base_url, "using PayPal payment provider");
            Ok(Arc::new(PayPalClient::from_config(paypal)?))
        }
        None => {
            tracing::warn!("PayPal credentials not set, using in-memory payment provider");
            Ok(Arc::new(InMemoryPaymentProvider::new()))
        }
    }
}

/// Creates the application state over the given store. Uploads are kept
/// under the configured directory and served from `/uploads`.
pub fn create_state<D: DocumentStore + Clone + 'static>(
    config: &Config,
    store: D,
) -> Result<Arc<AppState<D>>, PaymentError> {
    let provider = payment_provider(config)?;
    let jwt = JwtService::new(&config.jwt_secret, config.jwt_expiration_minutes);
    Ok(Arc::new(AppState::new(
        store,
        Arc::new(FileSystemAssetStore::new(config.upload_dir.clone(), ASSET_ROUTE)),
        provider,
        jwt,
        &config.admin_emails,
    )))
}
