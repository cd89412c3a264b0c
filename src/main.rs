use anyhow::Context;
use modelgate::config::ConfigLoader;
use modelgate::quota::QuotaEnforcer;
use modelgate::router::{ProviderRegistry, RelayEngine};
use modelgate::server::{self, AppState};
use modelgate::store::{KeyTier, MemoryStore};
use modelgate::HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("modelgate=info")),
        )
        .init();

    let config = ConfigLoader::new()
        .context("failed to load configuration")?
        .into_config();

    let store = Arc::new(MemoryStore::new(config.quota.log_retention_secs));
    seed_keys(&store);

    let registry = Arc::new(ProviderRegistry::from_config(&config));
    if registry.is_empty() {
        anyhow::bail!("no providers configured");
    }

    let http = HttpClient::new(
        Duration::from_secs(config.server.connect_timeout_secs),
        Duration::from_secs(config.server.request_timeout_secs),
    )?;

    let state = Arc::new(AppState {
        quota: QuotaEnforcer::new(store, &config)?,
        engine: RelayEngine::new(registry.clone(), http),
        catalog: config.catalog.clone(),
    });

    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;
    info!(
        addr = %config.server.listen_addr,
        providers = registry.len(),
        "gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// Register API keys listed in `MODELGATE_API_KEYS` as
/// `key[:tier]` pairs separated by commas, e.g. `abc:pro,def:basic`.
/// Key lifecycle management beyond this seed belongs to the admin
/// surface, which consumes the same store.
fn seed_keys(store: &MemoryStore) {
    let Ok(listed) = std::env::var("MODELGATE_API_KEYS") else {
        return;
    };

    for item in listed.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        let (key, tier) = item.split_once(':').unwrap_or((item, "basic"));
        let tier = match tier.trim() {
            "pro" => KeyTier::Pro,
            _ => KeyTier::Basic,
        };
        store.register_key(key.trim(), tier);
        info!(tier = ?tier, "registered api key");
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install ctrl-c handler");
    }
}
