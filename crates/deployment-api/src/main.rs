//! Deployment API Service
//!
//! REST API for creating, tracking and closing compute deployments

use anyhow::{Context, Result};
use deployment_api::{create_router, AppState, Config, MemoryStore, OrchestratorSettings};
use protocol_client::HttpProtocolClient;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "deployment_api=debug,protocol_client=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Deployment API Service");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Network: {}", config.network);
    info!("Protocol gateway: {}", config.gateway_url);
    info!("Default provider proxy: {}", config.provider_proxy_url);
    info!(
        "Balance gate: {} with minimum {} base units",
        config.balance_token, config.min_unlocked_balance
    );

    // Protocol client
    let client = HttpProtocolClient::new(
        &config.gateway_url,
        config.network,
        SecretString::from(config.private_key.expose_secret()),
        config.protocol_timeout,
    )
    .context("Failed to create protocol client")?;

    // Create application state
    let state = AppState::new(
        Arc::new(client),
        Arc::new(MemoryStore::new()),
        OrchestratorSettings::from(&config),
        config.network,
    );

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Deployment API running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
