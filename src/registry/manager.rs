//! Client Registry Implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{ConnectionHandle, ConnectionId};

/// Set of connections whose sessions have registered and not yet
/// unregistered.
///
/// Every operation takes the same mutex for an O(1) map update or a copy;
/// nothing logs or performs I/O while holding it.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ConnectionId, ConnectionHandle>>,
    total_registered: AtomicU64,
}

/// Point-in-time registry counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub active_clients: usize,
    pub total_registered: u64,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere cannot leave the map half-updated, so a poisoned
    // lock is still safe to use.
    fn clients(&self) -> MutexGuard<'_, HashMap<ConnectionId, ConnectionHandle>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a handle. Registering the same handle twice is a no-op.
    pub fn register(&self, handle: &ConnectionHandle) {
        let (inserted, active) = {
            let mut clients = self.clients();
            let inserted = clients.insert(handle.id(), handle.clone()).is_none();
            (inserted, clients.len())
        };

        if inserted {
            self.total_registered.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Registered {} from {} ({} active)",
                handle.id(),
                handle.remote_addr(),
                active
            );
        }
    }

    /// Remove a handle, returning whether it was present
    pub fn unregister(&self, handle: &ConnectionHandle) -> bool {
        let (removed, active) = {
            let mut clients = self.clients();
            let removed = clients.remove(&handle.id()).is_some();
            (removed, clients.len())
        };

        if removed {
            debug!(
                "Unregistered {} from {} after {:?} ({} active)",
                handle.id(),
                handle.remote_addr(),
                handle.age(),
                active
            );
        }
        removed
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.clients().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients().is_empty()
    }

    /// Copy of every registered handle, in no particular order
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.clients().values().cloned().collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let active_clients = self.len();
        let total_registered = self.total_registered.load(Ordering::Relaxed);

        RegistryStats {
            active_clients,
            total_registered,
        }
    }
}
