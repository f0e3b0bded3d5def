//! vcplay - Main entry point
//!
//! Wires the playback engine to the transport sidecar and serves the REST
//! control surface used by the bot's command handlers.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vcplay::api::{self, AppState};
use vcplay::config::Config;
use vcplay::playback::PlaybackEngine;
use vcplay::transport::HttpTransport;

/// Command-line arguments for vcplay
#[derive(Parser, Debug)]
#[command(name = "vcplay")]
#[command(about = "Per-chat voice-chat playback engine")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "VCPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "VCPLAY_PORT")]
    port: Option<u16>,

    /// Base URL of the transport sidecar (overrides config file)
    #[arg(long, env = "VCPLAY_TRANSPORT_URL")]
    transport_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(url) = args.transport_url {
        config.transport_url = url;
    }

    init_tracing(&config)?;

    info!("Starting vcplay on port {}", config.port);
    info!("Transport sidecar: {}", config.transport_url);
    info!(
        "Idle grace: {}s, queue limit: {}",
        config.idle_grace_secs,
        if config.queue_limit == 0 {
            "unbounded".to_string()
        } else {
            config.queue_limit.to_string()
        }
    );

    let transport = Arc::new(HttpTransport::new(config.transport_url.clone()));
    let engine = Arc::new(PlaybackEngine::new(
        transport,
        config.idle_grace(),
        config.queue_limit,
    ));
    info!("Playback engine initialized");

    let app_state = AppState {
        engine,
        port: config.port,
    };
    let app = api::create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

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

/// Initialize the tracing subscriber from config
fn init_tracing(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("vcplay={},tower_http=warn", config.logging.level).into());

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
