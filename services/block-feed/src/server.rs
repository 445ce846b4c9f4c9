//! Republishing server for the Block Feed Service
//!
//! Read-only display endpoints over the latest [`FeedSnapshot`]:
//! - `GET /v1/ticker`: current snapshot as JSON
//! - `GET /v1/metrics`: feed counters
//! - `GET /v1/ws`: WebSocket pushing every new snapshot as a text frame
//!
//! Handlers only read from the `watch` channel; nothing here can block the
//! aggregation path.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::metrics::FeedMetrics;
use crate::snapshot::FeedSnapshot;

/// Shared state for the display endpoints.
#[derive(Clone)]
pub struct AppState {
    pub snapshots: watch::Receiver<Arc<FeedSnapshot>>,
    pub metrics: Arc<FeedMetrics>,
}

impl AppState {
    pub fn new(snapshots: watch::Receiver<Arc<FeedSnapshot>>, metrics: Arc<FeedMetrics>) -> Self {
        Self { snapshots, metrics }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/ticker", get(ticker))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws_handler));

    Router::new()
        .nest("/v1", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the display endpoints until `shutdown` flips to `true`.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Display server listening");
    }

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
}

pub async fn ticker(State(state): State<AppState>) -> Json<FeedSnapshot> {
    let snapshot = state.snapshots.borrow().clone();
    Json(snapshot.as_ref().clone())
}

pub async fn metrics(State(state): State<AppState>) -> Json<BTreeMap<String, u64>> {
    Json(state.metrics.export())
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_snapshots(socket, state.snapshots))
}

/// Push the current snapshot, then one frame per published change.
async fn stream_snapshots(mut socket: WebSocket, mut snapshots: watch::Receiver<Arc<FeedSnapshot>>) {
    debug!("Display client connected");

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let text = match serde_json::to_string(snapshot.as_ref()) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to encode snapshot");
                break;
            }
        };

        if socket.send(Message::Text(text)).await.is_err() {
            break;
        }

        if !wait_for_change(&mut socket, &mut snapshots).await {
            break;
        }
    }

    debug!("Display client disconnected");
}

/// Wait for the next published snapshot. Returns `false` when the client
/// went away or the publisher stopped.
async fn wait_for_change(
    socket: &mut WebSocket,
    snapshots: &mut watch::Receiver<Arc<FeedSnapshot>>,
) -> bool {
    loop {
        tokio::select! {
            changed = snapshots.changed() => return changed.is_ok(),
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return false,
                // Inbound messages carry no meaning here
                Some(Ok(_)) => {}
            },
        }
    }
}
