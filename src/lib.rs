//! Metrics Ingest Library
//!
//! A small TCP ingestion endpoint: every accepted client gets its own task
//! that reads raw chunks, decodes each one as a metrics record and logs it.
//! Active clients are tracked in a shared registry for the lifetime of
//! their session.

pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use connection::ConnectionManager;
pub use error::IngestError;
pub use protocol::MetricsRecord;
pub use registry::ClientRegistry;
pub use session::ConnectionSession;

/// Common result type for configuration and process plumbing
pub type Result<T> = anyhow::Result<T>;
