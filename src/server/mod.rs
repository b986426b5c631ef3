//! Transport binding: HTTP server, WebSocket handling, connection store

mod http;
mod store;
mod websocket;

pub use http::{run, AppState};
pub use store::{ConnectionStore, OutboundSender};
