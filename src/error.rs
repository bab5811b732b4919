//! Server Error Types

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors raised by the listener and by connection sessions.
///
/// Decode failures live in [`crate::protocol::DecodeError`]; they never end
/// a session.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The listening socket could not be created. Fatal for the process.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The listener failed while waiting for a client. Ends the accept loop.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    /// The configured chunk size is zero, so no read could make progress
    #[error("buffer size must be greater than 0")]
    InvalidBufferSize,

    /// Reading from one client stream failed. Ends that session only.
    #[error("failed to read from {addr}: {source}")]
    StreamRead {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

impl IngestError {
    /// Whether the error stops the process from accepting new clients
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::Bind { .. } | IngestError::Accept(_) | IngestError::InvalidBufferSize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();

        let bind = IngestError::Bind {
            addr,
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert!(bind.is_fatal());
        assert!(bind.to_string().contains("127.0.0.1:8080"));

        let accept = IngestError::Accept(io::Error::from(io::ErrorKind::Other));
        assert!(accept.is_fatal());

        let read = IngestError::StreamRead {
            addr,
            source: io::Error::from(io::ErrorKind::ConnectionReset),
        };
        assert!(!read.is_fatal());

        assert!(IngestError::InvalidBufferSize.is_fatal());
    }
}
