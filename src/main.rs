use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wechat_sidecar::adapter::{AdapterSettings, WeChatAdapter};
use wechat_sidecar::api::{routes::create_router, state::AppState};
use wechat_sidecar::backend::BridgeFactory;
use wechat_sidecar::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    tracing::info!(
        "Using {} via bridge {} (packaged: {})",
        config.wechat_lib,
        config.bridge_url,
        config.packaged
    );
    if !config.auth_enabled() {
        tracing::warn!("API_KEYS is empty, API key checks are disabled");
    }

    let factory = Arc::new(BridgeFactory::new(&config.bridge_url, config.packaged));
    let adapter = WeChatAdapter::create(factory, AdapterSettings::from(&config))
        .await
        .context("WeChat adapter initialization failed")?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;

    let state = Arc::new(AppState::new(Arc::new(adapter), config));
    let app = create_router(state);

    tracing::info!("WeChat sidecar starting on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
