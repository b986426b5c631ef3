//! Session registry
//!
//! Process-wide map from document id to live session, owned by the hub
//! task. Sessions are created lazily on the first join and destroyed the
//! instant their participant list drains to zero. Lookups for edits and
//! undo/redo treat an absent session as a no-op, never an error.
//!
//! A membership index (connection id -> document id) makes `leave` a direct
//! lookup rather than a scan over every session.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::protocol::{ConnectionId, DocumentId};
use crate::session::DocumentSession;

/// Registry statistics for the health endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub sessions: usize,
    pub participants: usize,
    pub history_entries: usize,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<DocumentId, DocumentSession>,
    membership: HashMap<ConnectionId, DocumentId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, document_id: DocumentId) -> bool {
        self.sessions.contains_key(&document_id)
    }

    /// Existing session, or a new one seeded with `initial_content`.
    pub fn get_or_create(
        &mut self,
        document_id: DocumentId,
        initial_content: String,
    ) -> &mut DocumentSession {
        self.sessions.entry(document_id).or_insert_with(|| {
            debug!(document_id, "session created");
            DocumentSession::new(document_id, initial_content)
        })
    }

    pub fn find(&self, document_id: DocumentId) -> Option<&DocumentSession> {
        self.sessions.get(&document_id)
    }

    pub fn find_mut(&mut self, document_id: DocumentId) -> Option<&mut DocumentSession> {
        self.sessions.get_mut(&document_id)
    }

    pub fn remove(&mut self, document_id: DocumentId) {
        if self.sessions.remove(&document_id).is_some() {
            debug!(document_id, "session destroyed");
        }
    }

    /// Record which session a connection belongs to.
    pub fn bind(&mut self, connection_id: ConnectionId, document_id: DocumentId) {
        self.membership.insert(connection_id, document_id);
    }

    /// Forget a connection, returning the session it belonged to.
    pub fn unbind(&mut self, connection_id: &str) -> Option<DocumentId> {
        self.membership.remove(connection_id)
    }

    pub fn document_of(&self, connection_id: &str) -> Option<DocumentId> {
        self.membership.get(connection_id).copied()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            sessions: self.sessions.len(),
            participants: self.sessions.values().map(|s| s.participants.len()).sum(),
            history_entries: self
                .sessions
                .values()
                .map(|s| s.undo_stack.len() + s.redo_stack.len())
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_seeds_once() {
        let mut registry = SessionRegistry::new();
        registry.get_or_create(7, "first".to_string());
        let session = registry.get_or_create(7, "second".to_string());
        assert_eq!(session.content, "first");
        assert!(registry.contains(7));
        assert!(!registry.contains(8));
    }

    #[test]
    fn test_find_absent_is_none() {
        let registry = SessionRegistry::new();
        assert!(registry.find(42).is_none());
    }

    #[test]
    fn test_membership_index() {
        let mut registry = SessionRegistry::new();
        registry.get_or_create(7, String::new());
        registry.bind("conn-a".to_string(), 7);

        assert_eq!(registry.document_of("conn-a"), Some(7));
        assert_eq!(registry.unbind("conn-a"), Some(7));
        assert_eq!(registry.unbind("conn-a"), None);
    }

    #[test]
    fn test_stats_counts_sessions_and_history() {
        let mut registry = SessionRegistry::new();
        registry.get_or_create(1, "a".to_string());
        registry.get_or_create(2, "b".to_string());
        let stats = registry.stats();
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.participants, 0);
        assert_eq!(stats.history_entries, 0);

        registry.remove(1);
        assert_eq!(registry.stats().sessions, 1);
    }
}
