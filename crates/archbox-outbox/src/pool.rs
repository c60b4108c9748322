use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use archbox_transport::Stream;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::outbox::Outbox;
use crate::socket::OutboxSocket;

/// Identifier handed out by [`OutboxPool::insert`].
pub type ConnectionId = u64;

/// A shared set of outboxes, one per live connection.
///
/// The pool only holds `Arc`s; each outbox keeps its own locking, so a slow
/// drain on one connection never blocks lookups on another.
pub struct OutboxPool<S: OutboxSocket = Stream> {
    next_id: AtomicU64,
    connections: RwLock<HashMap<ConnectionId, Arc<Outbox<S>>>>,
}

impl<S: OutboxSocket> Default for OutboxPool<S> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            connections: RwLock::new(HashMap::new()),
        }
    }
}

impl<S: OutboxSocket> OutboxPool<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an outbox and return its id.
    pub fn insert(&self, outbox: Outbox<S>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, peer = outbox.peer(), "connection registered");
        self.connections.write().insert(id, Arc::new(outbox));
        id
    }

    pub fn get(&self, id: ConnectionId) -> Option<Arc<Outbox<S>>> {
        self.connections.read().get(&id).cloned()
    }

    /// Unregister a connection and close its socket.
    pub fn remove(&self, id: ConnectionId) -> Option<Arc<Outbox<S>>> {
        let outbox = self.connections.write().remove(&id)?;
        outbox.force_disconnect();
        debug!(id, peer = outbox.peer(), "connection removed");
        Some(outbox)
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.connections.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Queue `frame` on every open connection. Returns how many accepted it.
    pub fn broadcast(&self, frame: impl Into<Bytes>) -> usize {
        let frame = frame.into();
        self.snapshot()
            .into_iter()
            .filter(|(_, outbox)| outbox.enqueue(frame.clone()).is_ok())
            .count()
    }

    /// Probe every connection and drop the ones whose peer has gone away.
    ///
    /// Returns the ids that were removed.
    pub fn reap(&self) -> Vec<ConnectionId> {
        let dead: Vec<ConnectionId> = self
            .snapshot()
            .into_iter()
            .filter(|(_, outbox)| !outbox.probe_liveness())
            .map(|(id, _)| id)
            .collect();

        for &id in &dead {
            self.remove(id);
        }
        if !dead.is_empty() {
            info!(reaped = dead.len(), remaining = self.len(), "reaped dead connections");
        }
        dead
    }

    fn snapshot(&self) -> Vec<(ConnectionId, Arc<Outbox<S>>)> {
        self.connections
            .read()
            .iter()
            .map(|(id, outbox)| (*id, Arc::clone(outbox)))
            .collect()
    }
}

impl<S: OutboxSocket + 'static> OutboxPool<S> {
    /// Start a worker on every connection that has work and no running
    /// worker. Returns how many workers were started.
    pub fn schedule(&self) -> usize {
        let mut started = 0;
        for (id, outbox) in self.snapshot() {
            if !outbox.has_more_work() || !outbox.can_assign_worker() {
                continue;
            }
            match outbox.spawn_worker() {
                Ok(()) => started += 1,
                Err(err) => warn!(id, %err, "failed to start outbox worker"),
            }
        }
        started
    }
}

impl<S: OutboxSocket> std::fmt::Debug for OutboxPool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboxPool")
            .field("connections", &self.len())
            .finish()
    }
}
