//! sp1sh-sw server entry point.
//!
//! Boots one service worker and exposes it as an MCP server on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use sp1sh_client::{FetchConfig, HttpFetcher};
use sp1sh_core::{AppConfig, CacheDb, CacheStore, MemoryStore};
use sp1sh_worker::ServiceWorker;
use tracing_subscriber::EnvFilter;

mod handler;
#[cfg(test)]
mod testing;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, version = %config.cache_version, "Starting sp1sh-sw on stdio transport");

    let store: Arc<dyn CacheStore> = if config.in_memory {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(CacheDb::open(&config.db_path).await?)
    };
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from(&config))?);
    let worker = Arc::new(ServiceWorker::new(&config, store, fetcher)?);

    match worker.start().await {
        Ok(state) => tracing::info!(%state, "worker ready"),
        Err(err) => tracing::error!(error = %err, "worker failed to start; requests still pass through the dispatcher"),
    }

    let janitor = if config.janitor_enabled { worker.register_janitor() } else { None };

    let handler = handler::Sp1shServer::new(worker);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    if let Some(janitor) = janitor {
        janitor.abort();
    }

    Ok(())
}
