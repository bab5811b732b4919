//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Size of one chunk read from a client stream
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Port used when nothing else is configured
pub const DEFAULT_PORT: u16 = 8080;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Upper bound on the bytes returned by a single read; each read is
    /// decoded on its own.
    pub buffer_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
