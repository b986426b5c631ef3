//! Live editing state: participants, history snapshots, document sessions
//!
//! A `DocumentSession` is owned exclusively by the hub task and mutated only
//! by the edit engine, so none of these types carry locks.

mod registry;

pub use registry::{RegistryStats, SessionRegistry};

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::broadcast::Channel;
use crate::protocol::{AccountId, ConnectionId, DocumentId};

/// One connected editor of one document.
///
/// Caret values are what the client last reported; they are not clamped
/// against the content length after concurrent edits.
#[derive(Clone)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub account_id: AccountId,
    pub display_name: String,
    pub caret_start: usize,
    pub caret_end: usize,
    pub channel: Arc<dyn Channel>,
}

/// Caret position remembered for one participant inside a history snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaretPosition {
    pub connection_id: ConnectionId,
    pub caret_start: usize,
    pub caret_end: usize,
}

/// Immutable snapshot used for undo/redo.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub content_snapshot: String,
    pub participant_positions: Vec<CaretPosition>,
}

impl HistoryEntry {
    /// Capture the session's current content and every participant's caret.
    pub fn capture(session: &DocumentSession) -> Self {
        Self {
            timestamp: Utc::now(),
            content_snapshot: session.content.clone(),
            participant_positions: session
                .participants
                .iter()
                .map(|p| CaretPosition {
                    connection_id: p.connection_id.clone(),
                    caret_start: p.caret_start,
                    caret_end: p.caret_end,
                })
                .collect(),
        }
    }

    /// Saved caret for a connection, if it was present when the snapshot
    /// was taken. Participants who joined later have no entry.
    pub fn position_of(&self, connection_id: &str) -> Option<(usize, usize)> {
        self.participant_positions
            .iter()
            .find(|p| p.connection_id == connection_id)
            .map(|p| (p.caret_start, p.caret_end))
    }
}

/// Live mutable state of one document being edited.
pub struct DocumentSession {
    pub document_id: DocumentId,
    pub content: String,
    /// Unique by connection id.
    pub participants: Vec<Participant>,
    pub undo_stack: VecDeque<HistoryEntry>,
    pub redo_stack: VecDeque<HistoryEntry>,
}

impl DocumentSession {
    /// Create an empty session seeded with the first joiner's content.
    pub fn new(document_id: DocumentId, initial_content: String) -> Self {
        Self {
            document_id,
            content: initial_content,
            participants: Vec::new(),
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
        }
    }

    pub fn participant(&self, connection_id: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.connection_id == connection_id)
    }

    pub fn participant_mut(&mut self, connection_id: &str) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.connection_id == connection_id)
    }

    pub fn remove_participant(&mut self, connection_id: &str) -> Option<Participant> {
        let idx = self
            .participants
            .iter()
            .position(|p| p.connection_id == connection_id)?;
        Some(self.participants.remove(idx))
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Push onto the undo stack, dropping the oldest entry past the cap.
    pub fn push_undo(&mut self, entry: HistoryEntry, limit: usize) {
        push_bounded(&mut self.undo_stack, entry, limit);
    }

    /// Push onto the redo stack, dropping the oldest entry past the cap.
    pub fn push_redo(&mut self, entry: HistoryEntry, limit: usize) {
        push_bounded(&mut self.redo_stack, entry, limit);
    }
}

fn push_bounded(stack: &mut VecDeque<HistoryEntry>, entry: HistoryEntry, limit: usize) {
    while stack.len() >= limit.max(1) {
        stack.pop_front();
    }
    stack.push_back(entry);
}
