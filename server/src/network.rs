//! Server network layer: HTTP page, WebSocket upgrades and connection tasks

use crate::context::ServerContext;
use crate::processor::Connection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Presence server: shared context plus the settings of its HTTP front
pub struct Server {
    context: Arc<ServerContext>,
    index_file: PathBuf,
    outbound_buffer: usize,
}

impl Server {
    pub fn new(context: Arc<ServerContext>, index_file: impl Into<PathBuf>) -> Self {
        Self {
            context,
            index_file: index_file.into(),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }

    pub fn with_outbound_buffer(mut self, capacity: usize) -> Self {
        self.outbound_buffer = capacity.max(1);
        self
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/", get(page_or_socket))
            .route("/index.html", get(page_or_socket))
            .route("/ws", get(socket_only))
            .fallback(not_found)
            .with_state(self)
    }

    /// Serves connections on `listener` until `shutdown` resolves.
    pub async fn run<F>(self: Arc<Self>, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Server listening on {}", listener.local_addr()?);
        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
    }

    async fn serve_index(&self) -> Response {
        match tokio::fs::read(&self.index_file).await {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                error!("Failed to read {}: {}", self.index_file.display(), e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

async fn page_or_socket(
    State(server): State<Arc<Server>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    match ws {
        Some(ws) => upgrade(ws, server, peer),
        None => server.serve_index().await,
    }
}

async fn socket_only(
    State(server): State<Arc<Server>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(ws, server, peer)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

fn upgrade(ws: WebSocketUpgrade, server: Arc<Server>, peer: SocketAddr) -> Response {
    debug!("Upgrading connection from {}", peer);
    ws.on_upgrade(move |socket| handle_socket(socket, server))
}

/// Runs one connection: a writer task drains the outbound queue while this
/// task feeds inbound frames to the command processor in arrival order.
async fn handle_socket(socket: WebSocket, server: Arc<Server>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(server.outbound_buffer);

    let mut connection = Connection::open(Arc::clone(&server.context), tx).await;
    let id = connection.id().clone();

    let send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => connection.handle_text(&text).await,
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => connection.handle_text(text).await,
                Err(e) => warn!("Dropping non-UTF-8 frame from {}: {}", id, e),
            },
            Ok(Message::Close(_)) => {
                debug!("Session {} sent close", id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error on {}: {}", id, e);
                break;
            }
        }
    }

    connection.close().await;
    drop(connection);
    if let Err(e) = send_task.await {
        debug!("Writer for {} ended abnormally: {}", id, e);
    }
}
