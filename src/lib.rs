//! Pondok - a boarding-house management backend.
//!
//! Pondok tracks rooms, tenants, monthly bills, payment-proof uploads and
//! maintenance reports behind a JSON REST API with two roles (admin and
//! tenant). The heart of the crate is the billing state machine in
//! [`billing`]: a bill moves `UNPAID` → `AWAITING_VERIFICATION` →
//! `PAID`/`REJECTED`, every transition applied as a guarded conditional
//! write so concurrent submissions or decisions resolve to exactly one
//! winner.
//!
//! # Architecture
//!
//! - **Storage**: the [`store::Store`] trait with a sqlx/SQLite backend and
//!   an in-memory backend for tests and local development
//! - **Billing**: [`billing::BillingEngine`] owning proof submission,
//!   payment verification and bill issuance
//! - **Auth**: JWT identities plus a privileged service key for
//!   server-to-server automation
//! - **Notifications**: fire-and-forget webhook delivery of payment-status
//!   messages via [`notify::PaymentNotifier`]

pub mod api;
pub mod auth;
pub mod billing;
mod config;
pub mod domain;
mod error;
pub mod health;
pub mod http;
pub mod notify;
pub mod store;
pub mod uploads;

// Re-exports for public API
pub use config::{
    AuthConfig, Config, ConfigBuilder, CorsConfig, DatabaseConfig, LoggingConfig, NotifierConfig,
    ServerConfig, UploadConfig,
};
pub use error::{ApiError, Result};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults.
///
/// This should be called once, early in `main()`, before the server starts.
/// `RUST_LOG` overrides the configured level filter.
pub fn init_tracing(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
