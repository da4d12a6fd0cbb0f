//! Active-connection set owned by the listener.
//!
//! Entries are added once a WebSocket handshake completes and removed when
//! the connection closes. Connection tasks run on a multi-threaded runtime,
//! so the map sits behind an `Arc<RwLock<>>`.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Unique identifier of one accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the listener knows about an active connection
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub peer: SocketAddr,
    pub connected_at: SystemTime,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionInfo>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, id: ConnectionId, peer: SocketAddr) {
        let info = ConnectionInfo {
            peer,
            connected_at: SystemTime::now(),
        };
        let mut connections = self.connections.write().await;
        connections.insert(id, info);
        debug!("Registered connection {} from {} ({} active)", id, peer, connections.len());
    }

    /// Remove `id`; returns the entry if it was registered.
    pub async fn deregister(&self, id: &ConnectionId) -> Option<ConnectionInfo> {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(id);
        if removed.is_some() {
            debug!("Deregistered connection {} ({} active)", id, connections.len());
        }
        removed
    }

    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(id)
    }

    pub async fn get(&self, id: &ConnectionId) -> Option<ConnectionInfo> {
        self.connections.read().await.get(id).cloned()
    }

    pub async fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.connections.read().await.keys().copied().collect();
        ids.sort();
        ids
    }
}
