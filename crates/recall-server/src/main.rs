//! recall-server - REST API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use recall_core::{MonitorScheduler, RecallConfig};
use recall_server::{create_server, create_server_with_auth, AppState};
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// `RECALL_CONFIG` names a TOML/JSON/YAML file; otherwise `RECALL_*` variables apply.
fn load_config() -> anyhow::Result<RecallConfig> {
    match std::env::var("RECALL_CONFIG") {
        Ok(path) => RecallConfig::from_file(&path).with_context(|| format!("loading configuration from {}", path)),
        Err(_) => RecallConfig::from_env().context("loading configuration from environment"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("recall_server=debug".parse()?),
        )
        .init();

    let host = std::env::var("RECALL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("RECALL_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .context("RECALL_PORT must be a valid port number")?;
    let require_auth = std::env::var("RECALL_REQUIRE_AUTH").is_ok();

    let config = load_config()?;
    let state = AppState::from_config(config)?;

    // Periodic collection, flush and dashboard refresh
    let mut scheduler = MonitorScheduler::new(state.monitor().clone()).await?;
    scheduler.start().await?;
    info!("Monitor scheduler started");

    let app = if require_auth {
        info!("Authentication enabled");
        create_server_with_auth(state.clone())
    } else {
        info!("Authentication disabled");
        create_server(state.clone())
    };

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting recall-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received, stopping monitor...");
        })
        .await?;

    // Final flush happens inside shutdown
    scheduler.shutdown().await?;

    info!("Server stopped cleanly");
    Ok(())
}
