//! metrics-ingest - TCP endpoint that decodes and logs host metrics
//!
//! Every client connection is served by its own task; each chunk read from
//! the socket is decoded as a `{"cpu": .., "memory": ..}` record and logged.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use metrics_ingest::{
    config::{Config, ConfigManager},
    ConnectionManager,
};

/// CLI arguments for metrics-ingest
#[derive(Parser, Debug)]
#[command(name = "metrics-ingest")]
#[command(about = "TCP ingestion endpoint for host metrics records")]
#[command(version)]
#[command(long_about = "
TCP ingestion endpoint for host metrics records.

Clients send JSON objects such as {\"cpu\": 42.5, \"memory\": 3.25}. Each read
from a connection is decoded on its own and logged.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  METRICS_INGEST_BIND_ADDR    - Bind address (e.g., 0.0.0.0:8080)
  METRICS_INGEST_BUFFER_SIZE  - Chunk size in bytes
  METRICS_INGEST_LOG_LEVEL    - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "Bind address (e.g., 0.0.0.0:8080)")]
    pub bind: Option<String>,

    /// Port to bind to (overrides config file)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Chunk size in bytes
    #[arg(long, help = "Chunk size in bytes")]
    pub buffer_size: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Install the subscriber first so configuration loading is logged, then
    // narrow it to the resolved level.
    let filter = init_tracing(cli_log_level(&args))?;

    let config = resolve_config(&args)?;

    let level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    filter
        .reload(build_filter(level))
        .context("Failed to apply configured log level")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Bind address: {}", config.server.bind_addr);
        info!("  Buffer size: {} bytes", config.server.buffer_size);
        info!("  Log level: {}", config.logging.level);
        return Ok(());
    }

    let manager = match ConnectionManager::bind(&config.server).await {
        Ok(manager) => manager,
        Err(e) => {
            error!("Something went wrong, {}", e);
            return Err(e.into());
        }
    };

    // Only returns once the listener fails; sessions still running are
    // torn down with the runtime.
    manager.run().await?;

    Ok(())
}

/// Load configuration with priority: CLI args > config file > environment > defaults
fn resolve_config(args: &CliArgs) -> Result<Config> {
    let mut config = ConfigManager::load(&args.config)?;

    config.merge_with_cli_args(
        args.bind.as_deref(),
        args.port,
        args.buffer_size,
        args.log_level.as_deref(),
    )?;

    config
        .validate()
        .context("Final configuration validation failed")?;

    Ok(config)
}

/// Level used until the configuration has been resolved
fn cli_log_level(args: &CliArgs) -> &str {
    if args.verbose {
        "debug"
    } else {
        args.log_level.as_deref().unwrap_or("info")
    }
}

/// `RUST_LOG` wins over the configured level
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize tracing/logging with a filter that can be swapped later
fn init_tracing(log_level: &str) -> Result<reload::Handle<EnvFilter, Registry>> {
    let (filter, handle) = reload::Layer::new(build_filter(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(handle)
}
