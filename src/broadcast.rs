//! Outbound delivery: the channel capability and the broadcast dispatcher
//!
//! Each participant carries an explicit send capability instead of a
//! duck-typed transport handle. Delivery is fire-and-forget: no ack, no
//! retry. A channel whose connection has gone away silently drops the
//! message; `leave` eventually prunes the participant.

use tokio::sync::mpsc;
use tracing::trace;

use crate::protocol::ServerMessage;
use crate::session::DocumentSession;

/// Per-connection send capability implemented by the transport.
pub trait Channel: Send + Sync {
    fn send(&self, message: ServerMessage);
}

/// The WebSocket transport hands each participant the write side of its
/// outbound queue. A closed receiver means the connection is draining.
impl Channel for mpsc::UnboundedSender<ServerMessage> {
    fn send(&self, message: ServerMessage) {
        let _ = mpsc::UnboundedSender::send(self, message);
    }
}

/// Deliver one message to every participant of a session, sender included.
pub fn broadcast(session: &DocumentSession, message: &ServerMessage) {
    for participant in &session.participants {
        participant.channel.send(message.clone());
    }
    trace!(
        document_id = session.document_id,
        recipients = session.participants.len(),
        "broadcast"
    );
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use super::Channel;
    use crate::protocol::ServerMessage;

    /// Channel that records every message it is asked to deliver.
    #[derive(Default)]
    pub struct RecordingChannel {
        sent: Mutex<Vec<ServerMessage>>,
    }

    impl RecordingChannel {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn take(&self) -> Vec<ServerMessage> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }

        pub fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl Channel for RecordingChannel {
        fn send(&self, message: ServerMessage) {
            self.sent.lock().unwrap().push(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingChannel;
    use super::*;
    use crate::session::{DocumentSession, Participant};

    #[test]
    fn test_broadcast_reaches_every_participant() {
        let mut session = DocumentSession::new(1, "abc".to_string());
        let a = RecordingChannel::new();
        let b = RecordingChannel::new();
        session.participants.push(Participant {
            connection_id: "conn-a".to_string(),
            account_id: "alice".to_string(),
            display_name: "Alice".to_string(),
            caret_start: 0,
            caret_end: 0,
            channel: a.clone(),
        });
        session.participants.push(Participant {
            connection_id: "conn-b".to_string(),
            account_id: "bob".to_string(),
            display_name: "Bob".to_string(),
            caret_start: 1,
            caret_end: 1,
            channel: b.clone(),
        });

        let msg = ServerMessage::RemoveUser {
            connection_id: "conn-c".to_string(),
        };
        broadcast(&session, &msg);

        assert_eq!(a.count(), 1);
        assert_eq!(b.count(), 1);
        assert_eq!(a.take()[0], msg);
    }
}
