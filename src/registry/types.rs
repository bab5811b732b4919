//! Connection Handle Types

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Opaque identifier of one accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh, unique id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0.simple())
    }
}

/// Identity of an open client stream plus the address it came from
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    remote_addr: SocketAddr,
    connected_at: Instant,
}

impl ConnectionHandle {
    /// Create a handle for a freshly accepted connection
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            remote_addr,
            connected_at: Instant::now(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Time since the connection was accepted
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
