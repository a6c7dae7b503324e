//! Pick N Brain Gateway Daemon
//!
//! Serves the game's HTTP API and forwards gated requests to the
//! generative-AI backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pnb_core::config::{self, GatewayConfig};
use pnb_gateway::backend::GeminiBackend;
use pnb_gateway::session::spawn_session_reaper;
use pnb_gateway::{server, GatewayState};

#[derive(Parser)]
#[command(name = "pnb-gateway")]
#[command(about = "Pick N Brain gateway daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// API key for the generative-AI service
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.foreground { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Pick N Brain gateway starting...");

    // Load configuration
    let config: GatewayConfig = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_path();
        if default_path.exists() {
            config::load_config(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                GatewayConfig::default()
            })
        } else {
            tracing::info!("Using default configuration");
            GatewayConfig::default()
        }
    };
    config.validate().context("Invalid configuration")?;

    let Some(api_key) = args.api_key.or_else(|| config.backend.api_key.clone()) else {
        bail!("GEMINI_API_KEY is not set; pass --api-key or set it in the environment");
    };

    // Override bind address if specified
    let bind_addr = args.bind.unwrap_or_else(|| config.bind_address.clone());

    let backend = GeminiBackend::new(&config.backend, api_key)
        .context("Failed to build AI backend client")?;
    let reaper_interval = config.reaper_interval;
    let state = Arc::new(
        GatewayState::new(config, Arc::new(backend)).context("Invalid session settings")?,
    );

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Setup signal handlers
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel_clone.cancel();
    });

    let reaper = spawn_session_reaper(
        Arc::clone(&state.sessions),
        reaper_interval,
        cancel.clone(),
    );

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    let served = server::serve(listener, Arc::clone(&state), cancel.clone()).await;

    // Stop the reaper even if the server failed on its own
    cancel.cancel();
    if let Err(e) = reaper.await {
        tracing::warn!("Session reaper task failed: {}", e);
    }
    served.context("HTTP server failed")?;

    tracing::info!("Gateway shutdown complete");
    Ok(())
}
