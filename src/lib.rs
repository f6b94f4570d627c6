pub mod api;
pub mod cache;
pub mod config;
pub mod extractor;
pub mod resolver;
pub mod upstream;
pub mod validator;

use anyhow::{anyhow, Context};
use config::Config;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============ SERVER ============

pub async fn serve(config: Config) -> anyhow::Result<()> {
    if config.scraper.api_key.is_none() {
        warn!("[config] SCRAPERAPI_KEY is not set; every resolve request will fail");
    }

    let app = api::router(api::AppState::from_config(&config));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;

    info!(
        "[server] listening on {} (cache ttl {}s)",
        config.server.bind_address, config.cache.ttl_secs
    );
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ ENTRY ============

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::get_config().map_err(|e| anyhow!("failed to load config: {}", e))?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(config))
}
