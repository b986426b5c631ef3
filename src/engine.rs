//! Edit application engine
//!
//! Pure session-state logic: applies one edit action (or an undo/redo) to a
//! session and decides what, if anything, gets broadcast. The hub owns
//! dispatch; these functions never touch a channel.
//!
//! Every successful INSERT/DELETE pushes a history entry capturing the
//! pre-edit state *before* mutating the content. Splice positions are char
//! indices clamped to the current content bounds, so a stale or malformed
//! position degrades to a truncated splice instead of a panic. Caret fields
//! themselves are never clamped.

use tracing::debug;

use crate::protocol::{EditAction, ServerMessage};
use crate::session::{DocumentSession, HistoryEntry};

/// Apply one `content_update` action from a participant.
///
/// Returns the message to broadcast to the whole session, or `None` when
/// nothing is emitted (caret-only updates, REPLACE, unknown sender).
pub fn apply_edit(
    session: &mut DocumentSession,
    connection_id: &str,
    action: EditAction,
    history_limit: usize,
) -> Option<ServerMessage> {
    if session.participant(connection_id).is_none() {
        debug!(
            connection_id,
            document_id = session.document_id,
            "edit from unknown participant dropped"
        );
        return None;
    }

    match action {
        EditAction::OnlyCaret {
            caret_start,
            caret_end,
        } => {
            if let Some(p) = session.participant_mut(connection_id) {
                p.caret_start = caret_start;
                p.caret_end = caret_end;
            }
            // Caret-only updates are applied locally but not rebroadcast.
            None
        }

        EditAction::Insert {
            inserted_at_pos,
            inserted_text,
        } => {
            let entry = HistoryEntry::capture(session);
            session.push_undo(entry, history_limit);

            let pos = inserted_at_pos.min(char_len(&session.content));
            let at = byte_offset(&session.content, pos);
            session.content.insert_str(at, &inserted_text);

            let advance = inserted_text.chars().count();
            let mut caret = (0, 0);
            if let Some(p) = session.participant_mut(connection_id) {
                // Carets are client-supplied and unclamped; advance must not overflow.
                p.caret_start = p.caret_start.saturating_add(advance);
                p.caret_end = p.caret_end.saturating_add(advance);
                caret = (p.caret_start, p.caret_end);
            }

            Some(ServerMessage::ContentUpdate {
                content: Some(session.content.clone()),
                caret_start: caret.0,
                caret_end: caret.1,
            })
        }

        EditAction::Delete {
            deleted_at_pos,
            deleted_length,
        } => {
            let entry = HistoryEntry::capture(session);
            session.push_undo(entry, history_limit);

            let len = char_len(&session.content);
            let start = deleted_at_pos.min(len);
            let end = deleted_at_pos.saturating_add(deleted_length).min(len);
            let range = byte_offset(&session.content, start)..byte_offset(&session.content, end);
            session.content.replace_range(range, "");

            let caret = session
                .participant(connection_id)
                .map(|p| (p.caret_start, p.caret_end))
                .unwrap_or((0, 0));

            Some(ServerMessage::ContentUpdate {
                content: Some(session.content.clone()),
                caret_start: caret.0,
                caret_end: caret.1,
            })
        }

        EditAction::Replace => {
            // Reserved by the protocol. Deliberately not an INSERT+DELETE pair.
            debug!(
                document_id = session.document_id,
                "REPLACE action received; defined no-op"
            );
            None
        }
    }
}

/// Undo the most recent edit.
///
/// Pops the undo stack (empty stack is a silent no-op), saves the current
/// state onto the redo stack, restores the popped snapshot, and returns the
/// broadcast carrying the restored content and the invoker's saved caret
/// (`(0, 0)` if the invoker has no position in the snapshot).
pub fn undo(
    session: &mut DocumentSession,
    connection_id: &str,
    history_limit: usize,
) -> Option<ServerMessage> {
    let entry = session.undo_stack.pop_back()?;
    let current = HistoryEntry::capture(session);
    session.push_redo(current, history_limit);

    let (caret_start, caret_end) = entry.position_of(connection_id).unwrap_or((0, 0));
    session.content = entry.content_snapshot;

    Some(ServerMessage::ContentUpdate {
        content: Some(session.content.clone()),
        caret_start,
        caret_end,
    })
}

/// Redo the most recently undone edit. Symmetric to [`undo`].
pub fn redo(
    session: &mut DocumentSession,
    connection_id: &str,
    history_limit: usize,
) -> Option<ServerMessage> {
    let entry = session.redo_stack.pop_back()?;
    let current = HistoryEntry::capture(session);
    session.push_undo(current, history_limit);

    let (caret_start, caret_end) = entry.position_of(connection_id).unwrap_or((0, 0));
    session.content = entry.content_snapshot;

    Some(ServerMessage::ContentUpdate {
        content: Some(session.content.clone()),
        caret_start,
        caret_end,
    })
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of a char position, clamped to the end of the string.
fn byte_offset(s: &str, char_pos: usize) -> usize {
    s.char_indices()
        .nth(char_pos)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
