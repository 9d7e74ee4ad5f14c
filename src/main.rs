use pondok::api::{self, AppState};
use pondok::notify::{NoopNotifier, PaymentNotifier, WebhookNotifier};
use pondok::store::{MemoryStore, SqliteStore, Store};
use pondok::ConfigBuilder;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ConfigBuilder::new().from_env().build()?;
    pondok::init_tracing(&config.logging);

    let store: Arc<dyn Store> = if config.database.url == "memory" {
        tracing::warn!("running on the in-memory store; data will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SqliteStore::connect(&config.database.url).await?)
    };

    let notifier: Arc<dyn PaymentNotifier> = match &config.notifier.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => {
            tracing::warn!("PONDOK_WEBHOOK_URL not configured; payment notifications disabled");
            Arc::new(NoopNotifier)
        }
    };

    let addr = config.server.addr()?;
    let state = AppState::new(Arc::new(config), store, notifier);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "pondok backend listening");
    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
