use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hydrant_gate::config::GateConfig;
use hydrant_gate::gate::Gate;
use hydrant_gate::store::StoreServer;

#[derive(Parser, Debug)]
#[command(name = "hydrant-gate", version, about = "Sliding-window admission gate")]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }

    info!("Starting Hydrant Gate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = GateConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(addr) = cli.addr {
        config.server.addr = addr;
    }
    config.validate()?;
    info!(
        addr = %config.server.addr,
        v1_actor = %config.actors.v1,
        v2_actors = ?config.actors.v2,
        "Configuration loaded"
    );

    let gate = Arc::new(Gate::from_config(&config)?);
    let server = StoreServer::bind(config.server.addr, gate)
        .await
        .with_context(|| format!("failed to bind {}", config.server.addr))?;

    server.serve().await?;

    info!("Hydrant Gate stopped");
    Ok(())
}
