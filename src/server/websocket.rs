//! WebSocket upgrade and connection handling for the collab endpoint
//!
//! Admission flow:
//! 1. The admission policy maps `?token=` to an account id.
//! 2. In dev mode, `?account=` is admitted directly.
//! 3. No established identity - upgrade refused with 401, no session state
//!    is touched.
//!
//! An admitted connection gets two tasks: a writer draining its outbound
//! queue into JSON text frames, and a reader decoding inbound frames into
//! hub commands. Socket close or error turns into a `Leave`.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::hub::HubCommand;
use crate::protocol::{AccountId, ClientMessage, ConnectionId, ServerMessage};
use crate::server::http::AppState;
use crate::server::store::OutboundSender;

type WsStream =
    hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>;

/// Handle WebSocket upgrade for the collab endpoint
pub async fn handle_collab_upgrade(
    state: Arc<AppState>,
    req: Request<Incoming>,
    addr: SocketAddr,
) -> Response<Full<Bytes>> {
    let query = req.uri().query().map(|q| q.to_string());
    let token = query_param(query.as_deref(), "token");
    let dev_account = query_param(query.as_deref(), "account");

    let Some(account_id) = state
        .admission
        .admit(token.as_deref(), dev_account.as_deref())
    else {
        warn!(
            "Collab upgrade refused for {}: no established identity",
            addr
        );
        return Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(
                r#"{"error": "Authentication required"}"#,
            )))
            .unwrap();
    };

    if state.connections.is_at_capacity() {
        warn!("Collab: at capacity, rejecting {}", addr);
        return Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(r#"{"error": "Server at capacity"}"#)))
            .unwrap();
    }

    match hyper_tungstenite::upgrade(req, None) {
        Ok((response, websocket)) => {
            tokio::spawn(async move {
                match websocket.await {
                    Ok(ws) => handle_connection(state, ws, account_id, addr).await,
                    Err(e) => error!("WebSocket upgrade failed for {}: {:?}", addr, e),
                }
            });

            response.map(|_| Full::new(Bytes::new()))
        }
        Err(e) => {
            error!("WebSocket upgrade error for {}: {:?}", addr, e);
            Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Full::new(Bytes::from(format!(
                    "WebSocket upgrade failed: {e}"
                ))))
                .unwrap()
        }
    }
}

/// Handle an established collab WebSocket connection
async fn handle_connection(
    state: Arc<AppState>,
    ws: WsStream,
    account_id: AccountId,
    addr: SocketAddr,
) {
    let connection_id: ConnectionId = Uuid::new_v4().to_string();
    let (mut write, mut read) = ws.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();

    state
        .connections
        .insert(connection_id.clone(), out_tx.clone());
    info!(%connection_id, %account_id, %addr, "collab connection established");

    // Writer: drain the outbound queue into JSON text frames. Exits when
    // every sender (store entry, participant channel, local clone) is gone.
    let writer_conn = connection_id.clone();
    tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            match serde_json::to_string(&message) {
                Ok(text) => {
                    if write.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(connection_id = %writer_conn, "outbound encode failed: {}", e);
                }
            }
        }
        let _ = write.close().await;
    });

    // Reader: decode inbound frames into hub commands.
    while let Some(frame) = read.next().await {
        let message = match frame {
            Ok(m) => m,
            Err(e) => {
                debug!(%connection_id, "read error: {}", e);
                break;
            }
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // tungstenite answers pings on the write half
            _ => continue,
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(inbound) => dispatch(&state, &connection_id, &account_id, &out_tx, inbound),
            Err(e) => {
                // Malformed payloads are an ingress concern; never crash on them.
                debug!(%connection_id, "malformed frame dropped: {}", e);
            }
        }
    }

    // Disconnect: prune transport state and leave the session.
    state.connections.remove(&connection_id);
    let _ = state.hub.send(HubCommand::Leave {
        connection_id: connection_id.clone(),
    });
    info!(%connection_id, "collab connection closed");
}

/// Translate one inbound message into a hub command
fn dispatch(
    state: &AppState,
    connection_id: &str,
    account_id: &str,
    out_tx: &OutboundSender,
    inbound: ClientMessage,
) {
    let command = match inbound {
        ClientMessage::NewUser(join) => HubCommand::Join {
            connection_id: connection_id.to_string(),
            account_id: account_id.to_string(),
            document_id: join.document_id,
            content: join.content,
            caret_start: join.caret_start,
            caret_end: join.caret_end,
            channel: Arc::new(out_tx.clone()),
        },
        ClientMessage::ContentUpdate(update) => HubCommand::Edit {
            connection_id: connection_id.to_string(),
            document_id: update.document_id,
            action: update.action,
        },
        ClientMessage::Undo { document_id } => HubCommand::Undo {
            connection_id: connection_id.to_string(),
            document_id,
        },
        ClientMessage::Redo { document_id } => HubCommand::Redo {
            connection_id: connection_id.to_string(),
            document_id,
        },
    };

    if state.hub.send(command).is_err() {
        warn!(connection_id, "hub unavailable; dropping inbound message");
    }
}

/// Extract a query string parameter
fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    let query = query?;
    for param in query.split('&') {
        if let Some((k, value)) = param.split_once('=') {
            if k == key {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_extraction() {
        assert_eq!(
            query_param(Some("token=abc&account=x"), "token"),
            Some("abc".to_string())
        );
        assert_eq!(
            query_param(Some("token=abc&account=x"), "account"),
            Some("x".to_string())
        );
        assert_eq!(query_param(Some("token=abc"), "missing"), None);
        assert_eq!(query_param(None, "token"), None);
    }
}
