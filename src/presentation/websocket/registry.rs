//! Connection Registry
//!
//! Session-keyed map of live connection handles. Every operation takes the
//! registry's single lock for the duration of the map operation only;
//! callers write to sockets after the lock is released.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::connection::ConnectionHandle;
use crate::infrastructure::metrics;

/// Registry of live connections keyed by session id
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the handle for `session_id`.
    ///
    /// Returns the handle that was replaced, if any.
    pub fn register(
        &self,
        session_id: impl Into<String>,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        let session_id = session_id.into();
        let (previous, count) = {
            let mut connections = self.connections.lock();
            let previous = connections.insert(session_id.clone(), handle);
            metrics::set_live_connections(connections.len());
            (previous, connections.len())
        };

        tracing::debug!(
            session_id = %session_id,
            replaced = previous.is_some(),
            connections = count,
            "Connection registered"
        );

        previous
    }

    /// Remove the entry for `session_id`. No-op if absent.
    pub fn unregister(&self, session_id: &str) -> Option<ConnectionHandle> {
        let (removed, count) = {
            let mut connections = self.connections.lock();
            let removed = connections.remove(session_id);
            if removed.is_some() {
                metrics::set_live_connections(connections.len());
            }
            (removed, connections.len())
        };

        if removed.is_some() {
            tracing::debug!(session_id = %session_id, connections = count, "Connection unregistered");
        }

        removed
    }

    /// Remove the entry only while it still points at `handle`.
    ///
    /// A connection tearing down must not evict a newer registration that
    /// reused its session id.
    pub fn unregister_if(&self, session_id: &str, handle: &ConnectionHandle) -> bool {
        let (removed, count) = {
            let mut connections = self.connections.lock();
            let owned = connections
                .get(session_id)
                .is_some_and(|current| Arc::ptr_eq(current, handle));
            if owned {
                connections.remove(session_id);
                metrics::set_live_connections(connections.len());
            }
            (owned, connections.len())
        };

        if removed {
            tracing::debug!(session_id = %session_id, connections = count, "Connection unregistered");
        }

        removed
    }

    pub fn lookup(&self, session_id: &str) -> Option<ConnectionHandle> {
        self.connections.lock().get(session_id).cloned()
    }

    /// Copy every entry out under the lock.
    pub fn snapshot(&self) -> Vec<(String, ConnectionHandle)> {
        self.connections
            .lock()
            .iter()
            .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}
