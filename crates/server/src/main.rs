//! swcache server entry point.
//!
//! Boots the cache worker and exposes its lifecycle hooks as MCP tools on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{CacheWorker, FetchConfig, HttpNetwork};
use swcache_core::{AppConfig, CacheStorage};
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
    let manifest = config.load_manifest()?;

    tracing::info!(
        cache = %config.cache_name(),
        origin = %config.origin,
        db = %config.db_path.display(),
        assets = manifest.len(),
        "starting swcache worker"
    );

    let storage = CacheStorage::open(&config.db_path).await?;
    let network = Arc::new(HttpNetwork::new(&FetchConfig::from(&config))?);
    let worker = Arc::new(CacheWorker::from_config(&config, manifest, storage, network)?);

    if config.auto_activate {
        worker.install().await?;
        worker.activate().await?;
    }

    let handler = handler::CacheWorkerServer::new(worker);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
