//! origin-relay
//!
//! A single-destination reverse relay built with Tokio, Axum and reqwest.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                     ORIGIN RELAY                     │
//!                     │                                                      │
//!  Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐   │
//!  ───────────────────┼─▶│  http   │──▶│ security │──▶│ request rewriter │   │
//!                     │  │ server  │   │  filter  │   └────────┬─────────┘   │
//!                     │  └─────────┘   └────┬─────┘            │             │
//!                     │                     │ 403              ▼             │
//!  Client Response    │  ┌──────────────┐   │          ┌──────────────┐      │
//!  ◀──────────────────┼──│   pipeline   │◀──┴──────────│   upstream   │◀─────┼── Backend
//!                     │  │ relay / 503  │              │  dispatcher  │      │
//!                     │  └──────────────┘              └──────────────┘      │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use origin_relay::config::{load_config, validate_config, ConfigError};
use origin_relay::http::RequestRewriter;
use origin_relay::lifecycle::shutdown_signal;
use origin_relay::observability::logging;
use origin_relay::security::AccessFilter;
use origin_relay::{HttpServer, ProxyPipeline, UpstreamDispatcher};

#[derive(Parser)]
#[command(name = "origin-relay")]
#[command(about = "Forward every allowed request to one fixed backend", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "origin-relay.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init(&config.observability);

    tracing::info!("origin-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let destination = validate_config(&config).map_err(ConfigError::Validation)?;
    let dispatcher = UpstreamDispatcher::new(&config.timeouts, destination.pin())?;
    let pipeline = ProxyPipeline::new(
        AccessFilter::from_config(&config.access),
        RequestRewriter::new(destination),
        dispatcher,
    );

    let destination = pipeline.rewriter().destination();
    tracing::info!(
        path = %cli.config.display(),
        mode = destination.mode(),
        host = ?destination.host_header(),
        blocked_user_agents = config.access.blocked_user_agents.len(),
        "Configuration loaded"
    );

    if cli.check {
        tracing::info!("Configuration OK");
        return Ok(());
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, pipeline);
    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
