//! Audit Proxy
//!
//! A transparent reverse proxy that forwards every request to a single
//! upstream and writes a human-readable record of each exchange.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────┐
//!                      │                  AUDIT PROXY                  │
//!     Client Request   │  ┌─────────┐   ┌─────────────┐   ┌─────────┐  │
//!     ─────────────────┼─▶│  http   │──▶│   capture   │──▶│ hyper   │──┼──▶ Upstream
//!                      │  │ server  │   │ body replay │   │ client  │  │
//!                      │  └─────────┘   └─────────────┘   └────┬────┘  │
//!                      │                                      │       │
//!     Client Response  │  ┌─────────────────────────────┐     │       │
//!     ◀────────────────┼──│ capture tee (copy on write) │◀────┘       │
//!                      │  └──────────────┬──────────────┘             │
//!                      │                 ▼                            │
//!                      │         ┌───────────────┐                    │
//!                      │         │ audit record  │──▶ stdout          │
//!                      │         └───────────────┘                    │
//!                      └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use audit_proxy::audit::sink_for;
use audit_proxy::config::{resolve_config, Overrides};
use audit_proxy::http::HttpServer;
use audit_proxy::lifecycle::{wait_for_signal, Shutdown};
use audit_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "audit-proxy")]
#[command(about = "Reverse proxy that writes an audit record of every exchange", long_about = None)]
struct Cli {
    /// Upstream URL every request is forwarded to.
    #[arg(long = "dest-url", alias = "dest_url")]
    dest_url: Option<String>,

    /// Binding address, e.g. ":8080" or "127.0.0.1:8080".
    #[arg(short, long)]
    port: Option<String>,

    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Operational log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config(
        cli.config.as_deref(),
        Overrides {
            upstream_url: cli.dest_url,
            bind_address: cli.port,
            log_level: cli.log_level,
        },
    )?;

    logging::init(&config.observability);

    tracing::info!("audit-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let sink = sink_for(config.audit.target);
    let server = HttpServer::new(config, sink)?;
    tracing::info!(
        upstream = %server.config().upstream.url,
        audit_target = ?server.config().audit.target,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
