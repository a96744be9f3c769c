use std::path::PathBuf;

use anyhow::Context;
use calendar_server::config::DEFAULT_CONFIG_PATH;
use calendar_server::ServerConfig;
use calendar_store::EventStore;
use calendar_telemetry::TelemetryConfig;
use clap::Parser;
use tracing::Level;

/// HTTP service for per-user calendar events.
#[derive(Debug, Parser)]
#[command(name = "calendar", version)]
struct Args {
    /// YAML config file (host, timeout). Missing file means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Also write logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Default log level. RUST_LOG takes precedence.
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ServerConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    let telemetry = calendar_telemetry::init_telemetry(TelemetryConfig {
        log_level: args.log_level,
        log_file: args.log_file,
        ..Default::default()
    })
    .context("failed to initialize telemetry")?;

    tracing::info!(host = %config.host, "Starting calendar server");

    let store = EventStore::new();
    let handle = calendar_server::start(&config, store, telemetry.metrics())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;

    tracing::info!(addr = %handle.addr, "Calendar server ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("Shutting down");
    handle.shutdown().await?;
    Ok(())
}
