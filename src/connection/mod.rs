//! Connection Management Module
//! 
//! Binds the listener and hands every accepted connection to its own
//! session task.

pub mod manager;

pub use manager::{ConnectionManager, ConnectionStats};
