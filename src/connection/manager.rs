//! Connection Manager Implementation

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::IngestError;
use crate::registry::{ClientRegistry, ConnectionHandle};
use crate::session::ConnectionSession;

/// Accepts TCP clients and spawns one session per connection.
///
/// Sessions are fire-and-forget: the accept loop never waits for them and
/// there is no limit on how many run at once.
pub struct ConnectionManager {
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    buffer_size: NonZeroUsize,
    connections_accepted: AtomicU64,
}

/// Connection statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub active_connections: usize,
    pub total_connections_accepted: u64,
}

impl ConnectionManager {
    /// Bind the listening socket.
    ///
    /// Fails with [`IngestError::InvalidBufferSize`] for a zero chunk size and
    /// with [`IngestError::Bind`] when the address cannot be acquired.
    pub async fn bind(config: &ServerConfig) -> Result<Self, IngestError> {
        let bind_addr = config.bind_addr;
        let buffer_size =
            NonZeroUsize::new(config.buffer_size).ok_or(IngestError::InvalidBufferSize)?;

        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| IngestError::Bind {
                addr: bind_addr,
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| IngestError::Bind {
                addr: bind_addr,
                source,
            })?;

        info!("Server is starting on {}...", local_addr);

        Ok(Self {
            listener,
            local_addr,
            registry: Arc::new(ClientRegistry::new()),
            buffer_size,
            connections_accepted: AtomicU64::new(0),
        })
    }

    /// Address the listener is actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Registry shared with every session spawned by this manager
    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        ConnectionStats {
            active_connections: self.registry.len(),
            total_connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
        }
    }

    /// Accept connections until the listener fails.
    ///
    /// Only returns on an accept error, which is not retried. Sessions that
    /// are already running keep going.
    pub async fn run(&self) -> Result<(), IngestError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("Serving {}", addr);
                    self.connections_accepted.fetch_add(1, Ordering::Relaxed);
                    self.spawn_session(stream, addr);
                }
                Err(e) => {
                    error!("Connection error, {}", e);
                    return Err(IngestError::Accept(e));
                }
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, addr: SocketAddr) {
        let session = ConnectionSession::new(
            stream,
            ConnectionHandle::new(addr),
            Arc::clone(&self.registry),
            self.buffer_size,
        );

        tokio::spawn(session.run());
    }
}
