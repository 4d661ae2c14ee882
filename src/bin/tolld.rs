//! tolld: Tollgate daemon.
//!
//! Serves the [`DataGateway`](tollgate::DataGateway) over HTTP, so every
//! client shares one cache and one budget ledger.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use tollgate::server::config::{Config, Secrets};
use tollgate::server::{AppState, create_router};

/// Tollgate daemon, cost-aware data cache gateway.
#[derive(Parser)]
#[command(name = "tolld")]
#[command(version = tollgate::PKG_VERSION)]
#[command(about = "Tollgate data gateway daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: info for the daemon; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;
    let gateway = config.build_gateway(&secrets)?;

    let addr: SocketAddr = config.server.address.parse().map_err(|e| {
        tollgate::TollgateError::Configuration(format!("Invalid address: {e}"))
    })?;

    info!(
        version = tollgate::version_string(),
        %addr,
        providers = config.providers.len(),
        "tolld starting"
    );

    let app = create_router(
        AppState::new(Arc::new(gateway)),
        config.server.limits.max_concurrent_requests,
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("tolld stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
