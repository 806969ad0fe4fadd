//! WebSocket server.
//!
//! Any path on the loopback listener upgrades to a bridge session. Each
//! connection runs in its own task and owns nothing but its socket; the
//! serial connection is shared through the [`Bridge`].

use crate::bridge::Bridge;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State as AxumState,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::StreamExt;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Loopback address for a WebSocket port.
pub fn bind_addr(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

/// Router accepting upgrades on every path.
pub fn router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/{*path}", get(ws_handler))
        .with_state(bridge)
}

/// Serve sessions on `listener` until the returned future is dropped or the
/// listener fails.
pub async fn serve(listener: TcpListener, bridge: Arc<Bridge>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on ws://{}", addr);
    }
    axum::serve(listener, router(bridge)).await
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    AxumState(bridge): AxumState<Arc<Bridge>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, bridge))
}

async fn handle_socket(socket: WebSocket, bridge: Arc<Bridge>) {
    let client_id = Uuid::new_v4();
    let span = info_span!("session", %client_id);

    async move {
        info!("WebSocket client connected");
        let (sender, receiver) = socket.split();
        bridge.run_session(sender, receiver).await;
        info!("WebSocket client disconnected");
    }
    .instrument(span)
    .await
}
