//! Event input service entry point

use anyhow::{Context, Result};
use clap::Parser;
use input_adapter::{InputConfig, InputService, Lifecycle};
use message_sink::DirectSink;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overrides file and environment
    #[arg(short, long)]
    port: Option<u16>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if args.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let mut config = InputConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }

    info!(
        service = %config.name,
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        sink = %config.sink.endpoint,
        "Configuration loaded"
    );

    let sink = DirectSink::from_config(&config.sink).context("Invalid sink configuration")?;
    let lifecycle = Lifecycle::new();
    let signals = lifecycle.stop_on_signal();

    let service = InputService::new(config, Arc::new(sink), lifecycle)?;
    let report = service.run().await.context("Input service failed")?;
    signals.abort();

    if !report.drained {
        info!("Exited with undelivered events");
    }
    Ok(())
}
