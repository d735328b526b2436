//! Circuit-breaking API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                     API GATEWAY                      │
//!                     │                                                      │
//!   Client Request    │  ┌─────────┐    ┌──────────┐    ┌────────────────┐   │
//!   ──────────────────┼─▶│  http   │───▶│ routing  │───▶│ circuit breaker│   │
//!                     │  │ server  │    │ (prefix) │    │  (per backend) │   │
//!                     │  └─────────┘    └──────────┘    └───────┬────────┘   │
//!                     │                                         │            │
//!                     │                                         ▼            │
//!   Client Response   │  ┌─────────┐    ┌──────────┐    ┌────────────────┐   │
//!   ◀─────────────────┼──│response │◀───│ dispatch │◀───│ upstream caller│◀──┼── Backend
//!                     │  └─────────┘    └──────────┘    └────────────────┘   │
//!                     │                                                      │
//!                     │  config · observability · admin · lifecycle          │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use api_gateway::config::load_config;
use api_gateway::lifecycle::{shutdown_signal, Shutdown};
use api_gateway::observability::{logging, metrics};
use api_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "api-gateway")]
#[command(about = "HTTP gateway with per-backend circuit breakers", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        gateway_prefix = %config.gateway_prefix,
        backends = config.backends.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    shutdown.trigger_on(shutdown_signal());

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
