//! Collaboration hub: the single logical thread of control
//!
//! One hub task owns the session registry and drains a command queue. Every
//! command is handled to completion before the next one is dequeued,
//! regardless of which connection it came from; that total ordering is the
//! correctness mechanism, so session content and history stacks need no
//! locks. The only await inside a handler is the display-name lookup during
//! join.
//!
//! Failure paths here never raise: stale or unknown identifiers are logged
//! and dropped (the failure is structural, not transient, so there is
//! nothing to retry).

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::broadcast::{self, Channel};
use crate::directory::DisplayNameResolver;
use crate::engine;
use crate::protocol::{AccountId, ConnectionId, DocumentId, EditAction, ServerMessage};
use crate::session::{Participant, RegistryStats, SessionRegistry};

/// Default cap on undo/redo entries per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Commands delivered to the hub task, one per inbound transport event.
pub enum HubCommand {
    Join {
        connection_id: ConnectionId,
        account_id: AccountId,
        document_id: DocumentId,
        content: String,
        caret_start: usize,
        caret_end: usize,
        channel: Arc<dyn Channel>,
    },
    Edit {
        connection_id: ConnectionId,
        document_id: DocumentId,
        action: EditAction,
    },
    Undo {
        connection_id: ConnectionId,
        document_id: DocumentId,
    },
    Redo {
        connection_id: ConnectionId,
        document_id: DocumentId,
    },
    Leave {
        connection_id: ConnectionId,
    },
    Stats {
        reply: oneshot::Sender<RegistryStats>,
    },
}

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Undo/redo entries kept per session; the oldest is dropped past the cap.
    pub history_limit: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

pub struct Hub {
    registry: SessionRegistry,
    directory: Arc<dyn DisplayNameResolver>,
    config: HubConfig,
}

impl Hub {
    pub fn new(directory: Arc<dyn DisplayNameResolver>, config: HubConfig) -> Self {
        Self {
            registry: SessionRegistry::new(),
            directory,
            config,
        }
    }

    /// Spawn the hub task and return the write side of its command queue.
    pub fn spawn(
        directory: Arc<dyn DisplayNameResolver>,
        config: HubConfig,
    ) -> mpsc::UnboundedSender<HubCommand> {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Hub::new(directory, config);
        tokio::spawn(hub.run(rx));
        tx
    }

    /// Drain the command queue until every sender is gone.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<HubCommand>) {
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd).await;
        }
        info!("hub command queue closed; shutting down");
    }

    async fn handle(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Join {
                connection_id,
                account_id,
                document_id,
                content,
                caret_start,
                caret_end,
                channel,
            } => {
                self.join(
                    connection_id,
                    account_id,
                    document_id,
                    content,
                    caret_start,
                    caret_end,
                    channel,
                )
                .await;
            }
            HubCommand::Edit {
                connection_id,
                document_id,
                action,
            } => self.edit(&connection_id, document_id, action),
            HubCommand::Undo {
                connection_id,
                document_id,
            } => self.undo(&connection_id, document_id),
            HubCommand::Redo {
                connection_id,
                document_id,
            } => self.redo(&connection_id, document_id),
            HubCommand::Leave { connection_id } => self.leave(&connection_id),
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.registry.stats());
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn join(
        &mut self,
        connection_id: ConnectionId,
        account_id: AccountId,
        document_id: DocumentId,
        content: String,
        caret_start: usize,
        caret_end: usize,
        channel: Arc<dyn Channel>,
    ) {
        if let Some(current) = self.registry.document_of(&connection_id) {
            warn!(
                %connection_id,
                document_id, current, "join ignored: connection already in a session"
            );
            return;
        }

        // The participant is not joined until its display name resolves.
        let display_name = self
            .directory
            .resolve(&account_id)
            .await
            .unwrap_or_else(|| account_id.clone());

        let existed = self.registry.contains(document_id);
        let session = self.registry.get_or_create(document_id, content);

        // Re-sync a joiner of a live session to the canonical content.
        if existed {
            channel.send(ServerMessage::ContentUpdate {
                content: Some(session.content.clone()),
                caret_start,
                caret_end,
            });
        }

        // Announce the joiner to the current roster (joiner not yet listed).
        let announce = ServerMessage::NewUser {
            connection_id: connection_id.clone(),
            account_id: account_id.clone(),
            account_name: display_name.clone(),
            caret_start: None,
            caret_end: None,
        };
        broadcast::broadcast(session, &announce);

        // One-time roster snapshot for the joiner, remembered carets included.
        for p in &session.participants {
            channel.send(ServerMessage::NewUser {
                connection_id: p.connection_id.clone(),
                account_id: p.account_id.clone(),
                account_name: p.display_name.clone(),
                caret_start: Some(p.caret_start),
                caret_end: Some(p.caret_end),
            });
        }

        session.participants.push(Participant {
            connection_id: connection_id.clone(),
            account_id: account_id.clone(),
            display_name,
            caret_start,
            caret_end,
            channel,
        });
        let roster = session.participants.len();
        self.registry.bind(connection_id.clone(), document_id);

        info!(%connection_id, %account_id, document_id, roster, "participant joined");
    }

    fn edit(&mut self, connection_id: &str, document_id: DocumentId, action: EditAction) {
        let limit = self.config.history_limit;
        let Some(session) = self.registry.find_mut(document_id) else {
            debug!(document_id, "content_update for unknown session dropped");
            return;
        };
        if let Some(message) = engine::apply_edit(session, connection_id, action, limit) {
            broadcast::broadcast(session, &message);
        }
    }

    fn undo(&mut self, connection_id: &str, document_id: DocumentId) {
        let limit = self.config.history_limit;
        let Some(session) = self.registry.find_mut(document_id) else {
            debug!(document_id, "undo for unknown session dropped");
            return;
        };
        if session.participant(connection_id).is_none() {
            debug!(connection_id, document_id, "undo from unknown participant dropped");
            return;
        }
        if let Some(message) = engine::undo(session, connection_id, limit) {
            broadcast::broadcast(session, &message);
        }
    }

    fn redo(&mut self, connection_id: &str, document_id: DocumentId) {
        let limit = self.config.history_limit;
        let Some(session) = self.registry.find_mut(document_id) else {
            debug!(document_id, "redo for unknown session dropped");
            return;
        };
        if session.participant(connection_id).is_none() {
            debug!(connection_id, document_id, "redo from unknown participant dropped");
            return;
        }
        if let Some(message) = engine::redo(session, connection_id, limit) {
            broadcast::broadcast(session, &message);
        }
    }

    fn leave(&mut self, connection_id: &str) {
        let Some(document_id) = self.registry.unbind(connection_id) else {
            debug!(connection_id, "leave for unknown connection dropped");
            return;
        };
        let Some(session) = self.registry.find_mut(document_id) else {
            return;
        };
        if session.remove_participant(connection_id).is_none() {
            return;
        }

        broadcast::broadcast(
            session,
            &ServerMessage::RemoveUser {
                connection_id: connection_id.to_string(),
            },
        );

        let empty = session.is_empty();
        info!(connection_id, document_id, "participant left");
        if empty {
            self.registry.remove(document_id);
            info!(document_id, "last participant left; session destroyed");
        }
    }
}
