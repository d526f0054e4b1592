//! Main binary for the resource worker

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use worker_core::Config;
use worker_server::{init_logging, HttpServer};

#[derive(Parser)]
#[command(name = "resource-worker")]
#[command(about = "Synthetic CPU, memory, network and block I/O load generator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Name of the stats collector service (prometheus, statsd)
    #[arg(long, value_name = "PUBLISHER")]
    stats: Option<String>,

    /// Log level
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Listen port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(stats) = &self.stats {
            config.metrics.publisher = stats.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        node = %config.node.name,
        publisher = %config.metrics.publisher,
        "Starting resource-worker"
    );

    let server = HttpServer::new(config)
        .await
        .context("Failed to start resource-worker")?;
    server.serve().await?;

    Ok(())
}
