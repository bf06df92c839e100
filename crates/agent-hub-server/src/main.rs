//! Agent hub server.
//!
//! Run with: cargo run -p agent-hub-server
//!
//! Agents connect to `ws://<addr>/ws/<name>`; the frontend observer connects to
//! `ws://<addr>/chatlist_ws`.

mod app;
mod config;

use std::sync::Arc;

use agent_hub_transport::create_router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let hub = app::build_hub(&config).await?;

    // Build router
    let app = create_router(Arc::new(hub))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("Server listening on http://{}", config.addr);
    axum::serve(listener, app).await?;

    Ok(())
}
