//! API surface: application state and router assembly.
//!
//! The admin and tenant subtrees are role-gated by middleware built on the
//! single [`Identity::authorize`](crate::auth::Identity::authorize)
//! capability check, so a wrong role is rejected before any body parsing.
//! The mixed `/kamar` routes (listing is open to any authenticated caller,
//! mutation is admin-only) gate inside the handlers with the same check.

mod admin;
mod auth_routes;
mod rooms;
mod tenant;

use crate::auth::{authenticate, require_admin, require_tenant, PasswordHasher, TokenIssuer};
use crate::billing::BillingEngine;
use crate::config::{Config, CorsConfig};
use crate::health::health_handler;
use crate::notify::PaymentNotifier;
use crate::store::Store;
use crate::uploads::UploadStore;
use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub engine: Arc<BillingEngine>,
    pub tokens: TokenIssuer,
    pub hasher: PasswordHasher,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn Store>,
        notifier: Arc<dyn PaymentNotifier>,
    ) -> Self {
        let tokens = TokenIssuer::new(
            &config.auth.token_secret,
            Duration::from_secs(config.auth.token_ttl_seconds),
        );
        let uploads = UploadStore::new(config.uploads.dir.clone(), config.uploads.max_size);
        let engine = Arc::new(BillingEngine::new(store.clone(), notifier));

        Self {
            config,
            store,
            engine,
            tokens,
            hasher: PasswordHasher::new(),
            uploads,
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/register", post(auth_routes::register))
        .route("/auth/login", post(auth_routes::login));

    let admin_routes = Router::new()
        .route("/stats", get(admin::stats))
        .route("/settings", get(admin::settings).put(admin::update_settings))
        .route(
            "/penghuni",
            get(admin::list_tenants).post(admin::create_tenant),
        )
        .route("/tagihan", post(admin::issue_bill))
        .route("/pembayaran/pending", get(admin::pending_payments))
        .route("/pembayaran/{id}/confirm", post(admin::confirm_payment))
        .route("/laporan", get(admin::list_reports))
        .route("/laporan/{id}/status", put(admin::update_report_status))
        .layer(middleware::from_fn(require_admin));

    let tenant_routes = Router::new()
        .route("/tagihan/active", get(tenant::active_bill))
        .route("/tagihan/history", get(tenant::bill_history))
        .route("/tagihan/{id}/bayar", post(tenant::submit_payment))
        .route(
            "/laporan",
            get(tenant::my_reports).post(tenant::create_report),
        )
        .layer(middleware::from_fn(require_tenant));

    let protected = Router::new()
        .route(
            "/profile",
            get(auth_routes::profile).put(auth_routes::update_profile),
        )
        .route("/kamar", get(rooms::list).post(rooms::create))
        .route("/kamar/{id}", put(rooms::update))
        .nest("/admin", admin_routes)
        .nest("/penghuni", tenant_routes)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(public)
        .merge(protected)
        .nest_service("/uploads", ServeDir::new(state.uploads.dir().clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors))
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
