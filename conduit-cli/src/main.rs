//! Conduit CLI
//!
//! Command-line interface for managing stream-processing pipelines on a
//! remote data plane. Tracked records live in a local JSON state file.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::{Config, Overrides};
use conduit_reconciler::cancellation;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "conduit")]
#[command(about = "Conduit pipeline lifecycle CLI", long_about = None)]
struct Cli {
    /// File holding the tracked pipeline records
    #[arg(
        long,
        env = "CONDUIT_STATE_FILE",
        default_value = "conduit-state.json",
        global = true
    )]
    state_file: PathBuf,

    /// Control-plane URL, used to resolve clusters on import
    /// [default: $CONDUIT_CONTROL_PLANE_URL or https://api.redpanda.com]
    #[arg(long, global = true)]
    control_plane_url: Option<String>,

    /// Bearer token for the control and data planes [default: $CONDUIT_TOKEN]
    #[arg(long, global = true)]
    token: Option<String>,

    /// Default bound in seconds on each start/stop wait
    /// [default: $CONDUIT_OPERATION_TIMEOUT or 120]
    #[arg(long, global = true)]
    operation_timeout: Option<u64>,

    /// Timeout in seconds for each HTTP request
    /// [default: $CONDUIT_REQUEST_TIMEOUT or 30]
    #[arg(long, global = true)]
    request_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conduit_cli=info,conduit_reconciler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::load(
        cli.state_file,
        Overrides {
            control_plane_url: cli.control_plane_url,
            token: cli.token,
            operation_timeout: cli.operation_timeout,
            request_timeout: cli.request_timeout,
        },
    )?;

    // Ctrl-C ends any in-flight state wait early
    let (cancel_tx, cancel) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            let _ = cancel_tx.send(true);
        }
    });

    handle_command(cli.command, &config, cancel).await
}
