//! PAD Daemon - anomaly-detector workload controller
//!
//! The PAD daemon provides:
//! - Manifest loading into the record store
//! - Change-driven reconciliation of detector workloads
//! - Periodic resync and retry with backoff

use clap::Parser;
use pad_daemon::{ControllerRuntime, DaemonConfig, DaemonResult};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// PAD Daemon CLI
#[derive(Parser)]
#[command(name = "padd")]
#[command(about = "PAD Daemon - keeps anomaly-detector workloads converged", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PAD_CONFIG")]
    config: Option<String>,

    /// Log level
    #[arg(long, env = "PAD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "PAD_LOG_JSON")]
    json: bool,

    /// Detector manifest to load at startup (repeatable)
    #[arg(short, long = "manifest")]
    manifests: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // CLI args take precedence over file and environment
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;
    config.manifests.extend(cli.manifests);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        manifests = config.manifests.len(),
        max_concurrent = config.dispatcher.max_concurrent_reconciles,
        "Starting padd"
    );

    ControllerRuntime::new(config).run().await
}
