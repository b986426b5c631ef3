//! Connection store
//!
//! Tracks active WebSocket connections by connection id, holding the write
//! side of each connection's outbound queue. Capacity is enforced at upgrade
//! time; the store itself is transport state, not session state.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::{ConnectionId, ServerMessage};

/// Write side of a connection's outbound queue.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

pub struct ConnectionStore {
    connections: DashMap<ConnectionId, OutboundSender>,
    count: AtomicUsize,
    max_connections: usize,
}

impl ConnectionStore {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: DashMap::new(),
            count: AtomicUsize::new(0),
            max_connections,
        }
    }

    pub fn is_at_capacity(&self) -> bool {
        self.count.load(Ordering::Relaxed) >= self.max_connections
    }

    pub fn connection_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn insert(&self, connection_id: ConnectionId, sender: OutboundSender) {
        let was_present = self
            .connections
            .insert(connection_id.clone(), sender)
            .is_some();
        if !was_present {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            %connection_id,
            count = self.count.load(Ordering::Relaxed),
            "connection store: inserted"
        );
    }

    pub fn remove(&self, connection_id: &str) {
        if self.connections.remove(connection_id).is_some() {
            self.count.fetch_sub(1, Ordering::Relaxed);
            debug!(
                connection_id,
                count = self.count.load(Ordering::Relaxed),
                "connection store: removed"
            );
        }
    }

}
