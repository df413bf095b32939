//! # Switchboard
//!
//! WebSocket relay that lets independent clients meet on named channels.
//!
//! ## Usage
//!
//! ```bash
//! # Run on the default port (3055)
//! switchboard
//!
//! # Run on a custom port
//! switchboard --port=3056
//!
//! # Check whether a relay is already running
//! switchboard --probe --port=3056
//!
//! # Run with environment variables
//! SWITCHBOARD_PORT=3056 SWITCHBOARD_HOST=0.0.0.0 switchboard
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use switchboard_server::{config::Config, probe, run_server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "switchboard")]
#[command(about = "WebSocket channel relay", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Host address to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Path to a TOML config file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Only check whether a relay already answers on the port
    #[arg(long)]
    probe: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr so stdout stays free for whoever launched us
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "switchboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    }
    .with_overrides(args.host, args.port);

    if args.probe {
        let running = probe::is_relay_running(config.port).await;
        tracing::info!(port = config.port, running, "Relay probe");
        return Ok(if running {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    tracing::info!("Starting relay on {}:{}", config.host, config.port);

    switchboard_server::metrics::init_metrics();

    if let Err(e) = run_server(config).await {
        tracing::error!("Failed to start relay server: {}", e);
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
