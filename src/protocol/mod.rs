//! Metrics Wire Format
//! 
//! Each chunk read from a client is expected to hold one JSON object with
//! `cpu` and `memory` fields. Chunks are decoded independently; nothing is
//! buffered across reads.

pub mod codec;
pub mod types;

pub use codec::{decode_chunk, DecodeError};
pub use types::MetricsRecord;
