//! lownet server entry point.
//!
//! Loads configuration, opens the bucket store, runs install and activate
//! for the configured version, then serves MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use lownet_client::{FetchConfig, HttpFetcher};
use lownet_core::{AppConfig, CacheDb};
use lownet_proxy::CacheProxy;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let origin = config.origin_url()?;

    tracing::info!(origin = %origin, bucket = %config.cache_name, "Starting lownet on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = HttpFetcher::new(FetchConfig::from_app_config(&config)?)?;
    let proxy = Arc::new(CacheProxy::new(Arc::new(db), Arc::new(fetcher), origin, config.cache_name.clone()));

    match tools::proxy_update::run_lifecycle(&proxy).await {
        Ok(output) => tracing::info!(cached = output.cached, deleted = output.deleted.len(), "proxy active"),
        Err(e) => tracing::warn!(error = %e, "install failed; passing requests through until proxy_update succeeds"),
    }

    let handler = handler::LownetServer::new(proxy.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    let settled = proxy.refreshes().settle().await;
    tracing::info!(settled, "background refreshes drained");

    Ok(())
}
