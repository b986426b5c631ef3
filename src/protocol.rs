//! Wire protocol for the collaboration endpoint
//!
//! Messages are JSON text frames tagged by `event`, with the payload under
//! `data`. Inbound and outbound `new_user` frames share the event name but
//! carry different payloads: the inbound one is a join request, the outbound
//! one a roster notification.
//!
//! Inbound (client -> server):
//! - `new_user` - join a document session with locally-held content
//! - `content_update` - edit action (ONLY_CARET / INSERT / DELETE / REPLACE)
//! - `undo` / `redo` - history navigation
//!
//! Outbound (server -> client):
//! - `new_user` - a participant joined (or roster snapshot on join)
//! - `remove_user` - a participant left
//! - `content_update` - authoritative content plus a caret pair

use serde::{Deserialize, Serialize};

/// Document identifier.
pub type DocumentId = i64;

/// Connection identifier assigned by the transport on upgrade.
pub type ConnectionId = String;

/// Account identifier established by the admission predicate.
pub type AccountId = String;

/// Inbound messages (client -> server).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    NewUser(JoinRequest),
    ContentUpdate(ContentUpdate),
    Undo { document_id: DocumentId },
    Redo { document_id: DocumentId },
}

/// Payload of an inbound `new_user` frame.
///
/// `content` is the joiner's locally-held buffer; it seeds the session only
/// when the joiner is the first participant for this document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub document_id: DocumentId,
    pub content: String,
    #[serde(default)]
    pub caret_start: usize,
    #[serde(default)]
    pub caret_end: usize,
}

/// Payload of an inbound `content_update` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUpdate {
    pub document_id: DocumentId,
    #[serde(flatten)]
    pub action: EditAction,
}

/// Edit actions carried by `content_update` frames.
///
/// Positions are Unicode scalar (char) indices into the session content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditAction {
    /// Update only the sender's caret. Applied to the participant record,
    /// never rebroadcast, never recorded in history.
    OnlyCaret {
        caret_start: usize,
        caret_end: usize,
    },
    /// Splice text into the content at a char position.
    Insert {
        inserted_at_pos: usize,
        inserted_text: String,
    },
    /// Remove `[pos, pos + len)` from the content.
    Delete {
        deleted_at_pos: usize,
        deleted_length: usize,
    },
    /// Reserved for future use. Applying it is a defined no-op; it is not
    /// an INSERT+DELETE pair.
    Replace,
}

/// Outbound messages (server -> client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A participant joined. Caret fields are populated only in the one-time
    /// roster snapshot sent to a new joiner.
    NewUser {
        connection_id: ConnectionId,
        account_id: AccountId,
        account_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caret_start: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caret_end: Option<usize>,
    },
    /// A participant left.
    RemoveUser { connection_id: ConnectionId },
    /// Authoritative content plus a caret pair. Broadcast after every
    /// successful INSERT/DELETE/undo/redo, and sent to a joiner of an
    /// already-live session.
    ContentUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        caret_start: usize,
        caret_end: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_join_frame() {
        let json = r#"{"event":"new_user","data":{"document_id":7,"content":"Hello","caret_start":2,"caret_end":2}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::NewUser(join) => {
                assert_eq!(join.document_id, 7);
                assert_eq!(join.content, "Hello");
                assert_eq!(join.caret_start, 2);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_insert_action() {
        let json = r#"{"event":"content_update","data":{"document_id":1,"action":"INSERT","inserted_at_pos":4,"inserted_text":"xy"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::ContentUpdate(update) => {
                assert_eq!(update.document_id, 1);
                assert_eq!(
                    update.action,
                    EditAction::Insert {
                        inserted_at_pos: 4,
                        inserted_text: "xy".to_string(),
                    }
                );
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_replace_action() {
        let json = r#"{"event":"content_update","data":{"document_id":1,"action":"REPLACE"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::ContentUpdate(update) => assert_eq!(update.action, EditAction::Replace),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_encode_content_update_omits_empty_fields() {
        let msg = ServerMessage::ContentUpdate {
            content: None,
            caret_start: 1,
            caret_end: 3,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains(r#""content":"#));
        assert!(json.contains(r#""event":"content_update""#));
    }

    #[test]
    fn test_encode_roster_new_user_carries_caret() {
        let msg = ServerMessage::NewUser {
            connection_id: "c1".to_string(),
            account_id: "alice".to_string(),
            account_name: "Alice".to_string(),
            caret_start: Some(5),
            caret_end: Some(9),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""caret_start":5"#));
        assert!(json.contains(r#""account_name":"Alice""#));
    }
}
