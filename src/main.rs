//! Monster Server - Entry Point
//!
//! Starts the TCP listener and the game server, and shuts it down in order
//! on SIGINT/SIGTERM.

use std::env;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use monster_server::{Config, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=monster_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("monster_server=info")),
        )
        .init();

    let mut config = Config::from_env()?;

    // Bind address from command line overrides the environment
    if let Some(addr) = env::args().nth(1) {
        config.addr = addr;
    }

    let listener = TcpListener::bind(&config.addr).await?;
    info!("Monster Server listening on {}", config.addr);

    let server = Server::new(listener, config);
    let stop = server.stop_token();
    let server_task = tokio::spawn(server.run());

    if let Err(e) = wait_for_signal().await {
        error!("Failed to listen for shutdown signals: {}", e);
    }
    stop.cancel();

    server_task.await?;
    Ok(())
}

/// Wait for SIGINT or SIGTERM
#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => info!("SIGINT received - initiating graceful shutdown"),
        _ = sigterm.recv() => info!("SIGTERM received - initiating graceful shutdown"),
    }
    Ok(())
}

/// Wait for Ctrl+C
#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received - initiating graceful shutdown");
    Ok(())
}
