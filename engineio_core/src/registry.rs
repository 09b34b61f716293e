//! The process-wide map of live sessions.
//!
//! Not a singleton: a [`Registry`] is constructed explicitly and handed
//! to the dispatcher, so tests can run several independent instances in
//! one process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::socket::{SessionId, Socket};

/// Maps session IDs to live sockets.
///
/// Clones share the same map. Insertion happens only on session open
/// (before the `OPEN` response is written), removal only on `CLOSE`
/// handling; both are serialized through the lock, so a successful
/// lookup never observes a session removed by an earlier `CLOSE`.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    sockets: Arc<RwLock<HashMap<SessionId, Arc<Socket>>>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, socket: Arc<Socket>) {
        self.sockets
            .write()
            .await
            .insert(socket.id().clone(), socket);
    }

    /// Look up a session by ID.
    pub async fn get(&self, id: &SessionId) -> Option<Arc<Socket>> {
        self.sockets.read().await.get(id).cloned()
    }

    /// Remove a session. Idempotent; this is the sole source of session
    /// destruction.
    pub(crate) async fn remove(&self, id: &SessionId) -> Option<Arc<Socket>> {
        self.sockets.write().await.remove(id)
    }

    /// Snapshot of every currently open session.
    pub async fn sockets(&self) -> Vec<Arc<Socket>> {
        self.sockets.read().await.values().cloned().collect()
    }

    /// Number of currently open sessions.
    pub async fn len(&self) -> usize {
        self.sockets.read().await.len()
    }

    /// Whether no sessions are open.
    pub async fn is_empty(&self) -> bool {
        self.sockets.read().await.is_empty()
    }
}
