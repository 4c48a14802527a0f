//! TCP server
//!
//! Accepts connections, runs one handler task per connection, and owns the
//! `GameKeeper` task. Shutdown happens in a fixed order: stop accepting,
//! close every connection and wait for its task, then stop the keeper,
//! which in turn waits for every game.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

use crate::config::Config;
use crate::handler::handle_connection;
use crate::keeper::{GameKeeper, KeeperHandle};
use crate::registry::ConnectionRegistry;
use crate::types::SessionId;

pub struct Server {
    listener: TcpListener,
    config: Config,
    registry: Arc<ConnectionRegistry>,
    connections: TaskTracker,
    /// Cancelled to begin shutdown
    stop: CancellationToken,
    /// Shared by the keeper and every game
    shutdown: CancellationToken,
}

impl Server {
    pub fn new(listener: TcpListener, config: Config) -> Self {
        Self {
            listener,
            config,
            registry: Arc::new(ConnectionRegistry::new()),
            connections: TaskTracker::new(),
            stop: CancellationToken::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the server when cancelled
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Accept connections until stopped, then shut everything down
    pub async fn run(self) {
        let (keeper, handle) = GameKeeper::new(self.shutdown.clone(), self.config.tick_interval);
        let keeper_task = tokio::spawn(keeper.run());
        info!("GameKeeper actor started");

        self.accept_loop(&handle).await;
        drop(handle);
        self.shutdown_in_order(keeper_task).await;
    }

    async fn accept_loop(&self, keeper: &KeeperHandle) {
        info!("Accepting connections on {:?}", self.listener.local_addr());

        loop {
            let accepted = tokio::select! {
                _ = self.stop.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, addr) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let session_id = SessionId::new();
            info!("New connection from {} as {}", addr, session_id);

            let close = self.registry.register(session_id).await;
            let messenger = keeper.connect(session_id);
            let registry = Arc::clone(&self.registry);
            let timeouts = self.config.timeouts();

            // Spawn handler task for each connection
            self.connections.spawn(async move {
                if let Err(e) = handle_connection(stream, messenger, close, timeouts).await {
                    error!("Connection handler error for {}: {}", session_id, e);
                }
                registry.unregister(session_id).await;
            });
        }
    }

    async fn shutdown_in_order(self, keeper_task: JoinHandle<()>) {
        info!("Server stopping");
        drop(self.listener);

        self.registry.close_all().await;
        self.connections.close();
        self.connections.wait().await;
        info!("All connections closed");

        self.shutdown.cancel();
        if let Err(e) = keeper_task.await {
            error!("GameKeeper task failed: {}", e);
        }
        info!("Server stopped");
    }
}
