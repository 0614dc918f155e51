//! NoCap Daemon - news verification service
//!
//! Serves `POST /prediction` (verdict for a headline or URL) and
//! `GET /limit` (credential and search quota diagnostics).

use anyhow::Result;
use nocapd::config::{Config, Secrets};
use nocapd::{daemon, server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("NoCap Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load();
    if let Ok(port) = std::env::var("PORT") {
        match port.parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(_) => warn!("Ignoring invalid PORT value: {}", port),
        }
    }

    let secrets = Secrets::from_env(config.pipeline.max_credentials);
    let state = daemon::assemble(&config, secrets)?;

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    server::run(state, &addr).await
}
