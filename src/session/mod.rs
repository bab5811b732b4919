//! Connection Session Module
//! 
//! One session per accepted client: register, read and decode chunks until
//! the stream ends, then unregister and close.

pub mod handler;

pub use handler::{ChunkOutcome, ConnectionSession, SessionEnd, SessionReport};
