//! charex-web - live character card extraction service
//!
//! Accepts extraction jobs over a WebSocket, saves cards under the data
//! directory and pushes progress and new cards to every connected client.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use charex_common::config::TomlConfig;
use charex_ex::NormalizerRegistry;
use charex_web::hub::Hub;
use charex_web::{build_router, AppState};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for charex-web
#[derive(Parser, Debug)]
#[command(name = "charex-web")]
#[command(about = "Live character card extraction service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Output root for saved cards (falls back to DATA_DIR, then the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Directory holding the web client
    #[arg(long, env = "CHAREX_STATIC_DIR")]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("charex_web={0},charex_ex={0},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = config.resolve_port(args.port);
    let data_dir = config.resolve_data_dir(args.data_dir.as_deref());
    let static_dir = config.resolve_static_dir(args.static_dir.as_deref());
    info!("Data directory: {}", data_dir.display());
    if !static_dir.is_dir() {
        warn!("Static directory {} not found, web client unavailable", static_dir.display());
    }

    let registry = NormalizerRegistry::standard(Duration::from_secs(config.fetch.timeout_secs))
        .context("Failed to initialize source normalizers")?;
    let hub = Hub::spawn(&config.hub);

    let state = AppState::new(hub, registry, data_dir, static_dir);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting charex-web on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
