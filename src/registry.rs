//! Registry of live connections
//!
//! Connection tasks register themselves on accept and unregister on exit.
//! On shutdown the server closes every registered connection at once.
//! This is the only state shared between tasks outside the actors, so it
//! sits behind a mutex.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::SessionId;

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<SessionId, CancellationToken>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return the token that closes it
    pub async fn register(&self, session_id: SessionId) -> CancellationToken {
        let token = CancellationToken::new();
        self.connections
            .lock()
            .await
            .insert(session_id, token.clone());
        token
    }

    pub async fn unregister(&self, session_id: SessionId) {
        self.connections.lock().await.remove(&session_id);
    }

    /// Close every registered connection and empty the registry
    pub async fn close_all(&self) {
        let mut connections = self.connections.lock().await;
        debug!("Closing {} connections", connections.len());
        for (_, token) in connections.drain() {
            token.cancel();
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    #[cfg(test)]
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
