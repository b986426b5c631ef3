//! HTTP server implementation
//!
//! hyper http1 with TokioIo; WebSocket upgrades are delegated to the
//! websocket module. Everything except the collab endpoint is plain
//! request/response plumbing (health, version, CORS preflight).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::auth::AdmissionPolicy;
use crate::config::Args;
use crate::hub::HubCommand;
use crate::server::store::ConnectionStore;
use crate::server::websocket;
use crate::types::CoeditError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Write side of the hub's command queue.
    pub hub: mpsc::UnboundedSender<HubCommand>,
    /// Transport-level connection tracking.
    pub connections: Arc<ConnectionStore>,
    /// Admission predicate evaluated at upgrade time.
    pub admission: Arc<AdmissionPolicy>,
}

impl AppState {
    pub fn new(args: Args, hub: mpsc::UnboundedSender<HubCommand>) -> Self {
        let connections = Arc::new(ConnectionStore::new(args.max_connections));
        let admission = Arc::new(AdmissionPolicy::new(
            args.access_tokens.as_deref(),
            args.dev_mode,
        ));
        Self {
            args,
            hub,
            connections,
            admission,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), CoeditError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "coedit listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - token admission bypassed for ?account=");
    }
    if state.admission.is_configured() {
        info!("Token admission table configured");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (method, path.as_str()) {
        // Liveness probe with registry stats
        (Method::GET, "/health") | (Method::GET, "/healthz") => health_check(&state).await,

        // Version info for deployment verification
        (Method::GET, "/version") => version_info(),

        // Collaboration WebSocket endpoint
        (Method::GET, "/collab") => {
            if hyper_tungstenite::is_upgrade_request(&req) {
                websocket::handle_collab_upgrade(state, req, addr).await
            } else {
                bad_request_response("WebSocket upgrade required for /collab")
            }
        }

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        _ => not_found_response(&path),
    };

    Ok(response)
}

/// Health check with session registry statistics
async fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let (tx, rx) = oneshot::channel();
    let stats = if state.hub.send(HubCommand::Stats { reply: tx }).is_ok() {
        tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .ok()
            .and_then(|r| r.ok())
    } else {
        None
    };

    let Some(stats) = stats else {
        let body = serde_json::json!({ "status": "degraded", "error": "hub unavailable" });
        return Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();
    };

    let body = serde_json::json!({
        "status": "ok",
        "node_id": state.args.node_id,
        "connections": state.connections.connection_count(),
        "sessions": stats.sessions,
        "participants": stats.participants,
        "history_entries": stats.history_entries,
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Version info captured by the build script
fn version_info() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("GIT_COMMIT_SHORT"),
        "built_at": env!("BUILD_TIMESTAMP"),
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
        "hint": "Use a WebSocket connection to /collab"
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Bad request response
pub(crate) fn bad_request_response(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Bad Request",
        "message": message
    });

    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
