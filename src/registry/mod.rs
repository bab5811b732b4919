//! Client Registry Module
//! 
//! Tracks the connections whose sessions are currently running.

pub mod manager;
pub mod types;

pub use manager::{ClientRegistry, RegistryStats};
pub use types::{ConnectionHandle, ConnectionId};
