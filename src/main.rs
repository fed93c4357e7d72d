//! Call Analytics Service - Binary Entrypoint
//! Boots the Axum HTTP server, wiring config, the analytics engine and metrics.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use call_analytics::config::AppConfig;
use call_analytics::metrics::Metrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("call_analytics=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    let metrics = Metrics::init()?;
    let router = call_analytics::app(&cfg)?.merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;
    tracing::info!(bind = %cfg.server.bind, tenants = cfg.tenants.len(), "call analytics listening");

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
