//! Connection Session Handler

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, instrument, warn};

use crate::error::IngestError;
use crate::protocol::{decode_chunk, DecodeError, MetricsRecord};
use crate::registry::{ClientRegistry, ConnectionHandle};

/// Result of decoding one chunk
#[derive(Debug)]
pub enum ChunkOutcome {
    Decoded(MetricsRecord),
    Rejected(DecodeError),
}

/// Why a session stopped reading
#[derive(Debug)]
pub enum SessionEnd {
    /// The peer closed its side of the stream
    PeerClosed,
    /// A read failed; the session gave up on the stream
    ReadFailed(IngestError),
}

/// Summary of a finished session
#[derive(Debug)]
pub struct SessionReport {
    pub chunks_decoded: u64,
    pub chunks_rejected: u64,
    pub end: SessionEnd,
}

/// Keeps a handle registered for as long as it is alive
struct Registration {
    registry: Arc<ClientRegistry>,
    handle: ConnectionHandle,
}

impl Registration {
    fn new(registry: Arc<ClientRegistry>, handle: ConnectionHandle) -> Self {
        registry.register(&handle);
        Self { registry, handle }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(&self.handle);
    }
}

/// Owns one client stream from registration to close.
///
/// Every read is decoded on its own: a record split across two reads shows
/// up as two rejected chunks, and two records arriving in one read as a
/// single rejected chunk.
pub struct ConnectionSession<S> {
    stream: S,
    handle: ConnectionHandle,
    registry: Arc<ClientRegistry>,
    buffer_size: NonZeroUsize,
}

impl<S> ConnectionSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session; nothing is registered until [`run`](Self::run)
    pub fn new(
        stream: S,
        handle: ConnectionHandle,
        registry: Arc<ClientRegistry>,
        buffer_size: NonZeroUsize,
    ) -> Self {
        Self {
            stream,
            handle,
            registry,
            buffer_size,
        }
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Run the session to completion.
    ///
    /// The handle is unregistered exactly once on the way out, including
    /// when the future is dropped before finishing.
    #[instrument(
        name = "session",
        skip(self),
        fields(connection_id = %self.handle.id(), addr = %self.handle.remote_addr())
    )]
    pub async fn run(mut self) -> SessionReport {
        let registration = Registration::new(Arc::clone(&self.registry), self.handle.clone());

        let report = self.read_chunks().await;

        drop(registration);
        self.close().await;

        debug!(
            "Session finished: {} decoded, {} rejected",
            report.chunks_decoded, report.chunks_rejected
        );
        report
    }

    async fn read_chunks(&mut self) -> SessionReport {
        let mut buffer = vec![0u8; self.buffer_size.get()];
        let mut chunks_decoded = 0;
        let mut chunks_rejected = 0;

        let end = loop {
            match self.stream.read(&mut buffer).await {
                Ok(0) => {
                    info!("Client disconnected, {}", self.handle.remote_addr());
                    break SessionEnd::PeerClosed;
                }
                Ok(n) => match self.process_chunk(&buffer[..n]) {
                    ChunkOutcome::Decoded(_) => chunks_decoded += 1,
                    ChunkOutcome::Rejected(_) => chunks_rejected += 1,
                },
                Err(e) => {
                    let addr = self.handle.remote_addr();
                    error!("Error reading data from {}: {}", addr, e);
                    break SessionEnd::ReadFailed(IngestError::StreamRead { addr, source: e });
                }
            }
        };

        SessionReport {
            chunks_decoded,
            chunks_rejected,
            end,
        }
    }

    /// Decode one chunk and log the outcome
    pub fn process_chunk(&self, chunk: &[u8]) -> ChunkOutcome {
        match decode_chunk(chunk) {
            Ok(record) => {
                info!(
                    "Metrics from {} - CPU: {:.2}%, Memory: {:.2}GB",
                    self.handle.remote_addr(),
                    record.cpu,
                    record.memory
                );
                ChunkOutcome::Decoded(record)
            }
            Err(e) => {
                warn!("Invalid data from {}: {}", self.handle.remote_addr(), e);
                ChunkOutcome::Rejected(e)
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(
                "Shutdown of stream from {} failed: {}",
                self.handle.remote_addr(),
                e
            );
        }
    }
}
