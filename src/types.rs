//! Crate-level error and result types
//!
//! Edit handling never surfaces errors to clients (stale identifiers degrade
//! to logged no-ops); this error type covers the server bootstrap path.

use thiserror::Error;

/// Errors raised while starting or serving the transport.
#[derive(Debug, Error)]
pub enum CoeditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CoeditError>;
