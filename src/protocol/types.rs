//! Metrics Record Types

use serde::Serialize;

/// One host metrics sample as sent by a client.
///
/// Decoding lives in [`crate::protocol::codec`]: keys match regardless of
/// ASCII case, missing or `null` fields stay at `0.0` and unknown fields
/// are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsRecord {
    /// CPU utilisation in percent
    pub cpu: f64,
    /// Memory usage in gigabytes
    pub memory: f64,
}

impl MetricsRecord {
    /// Create a new record
    pub fn new(cpu: f64, memory: f64) -> Self {
        Self { cpu, memory }
    }

    /// Encode the record the way clients are expected to send it
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
