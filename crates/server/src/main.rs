//! shellcache server entry point.
//!
//! Boots the MCP server on stdio transport. The server is the worker's host:
//! it delivers install, activate and fetch events as tool calls.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchClient, FetchConfig, ShellWorker, WorkerHost};
use shellcache_core::{AppConfig, CacheDb, Manifest};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let origin = config.origin_url()?;

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache at {}", config.db_path.display()))?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let worker = ShellWorker::new(Arc::new(db), Arc::new(network), origin, Manifest::default());
    let host = Arc::new(WorkerHost::new(worker));

    tracing::info!(
        origin = %host.origin(),
        cache = %host.worker().manifest().cache_name,
        "Starting shellcache server on stdio transport"
    );

    if config.register_on_start
        && let Err(e) = host.register().await
    {
        tracing::warn!(error = %e, "worker registration failed; requests will pass through");
    }

    let handler = handler::ShellCacheServer::new(host);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
