//! srcwatch-mcp server entry point.
//!
//! Boots the source verification MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use srcwatch_client::{HttpProber, ProbeConfig, SourceVerifier};
use srcwatch_core::{AppConfig, CacheDb};
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

    let config = AppConfig::load()?;
    tracing::info!(db_path = %config.db_path.display(), "starting srcwatch-mcp on stdio transport");

    let cache = CacheDb::open(&config.db_path).await?;
    let prober = HttpProber::new(ProbeConfig::from(&config))?;
    let verifier = SourceVerifier::new(Arc::new(prober), Arc::new(cache.clone()))
        .with_max_concurrency(config.max_concurrency);

    let handler = handler::SourcesServer::new(Arc::new(verifier), cache);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
