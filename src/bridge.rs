//! Per-client relay between a WebSocket and the serial connection.
//!
//! A session runs two tasks over one socket and the shared
//! [`ConnectionManager`]:
//!
//! - **downlink** (browser to device): each inbound frame is written to the
//!   serial handle verbatim.
//! - **uplink** (device to browser): the handle is polled in chunks and
//!   every read, empty or not, is forwarded as one binary frame.
//!
//! Whichever task finishes first ends the session and the other is dropped
//! at its next await point. There is no half-duplex continuation.

use crate::connection::ConnectionManager;
use crate::monitor::{Direction, TrafficMonitor};
use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum bytes read from the serial handle per uplink cycle.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Pause after a failed serial read or reconnect, so a missing device is not
/// polled in a tight loop.
pub const DEFAULT_READ_BACKOFF: Duration = Duration::from_secs(1);

/// Tunables for a bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    pub chunk_size: usize,
    pub read_backoff: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_backoff: DEFAULT_READ_BACKOFF,
        }
    }
}

/// Why a session ended. None of these are errors for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed the socket or the stream ended.
    ClientClosed,
    /// Receiving from the client failed.
    ReceiveFailed(String),
    /// Sending to the client failed.
    SendFailed(String),
}

/// Relays traffic between WebSocket clients and the serial connection.
#[derive(Debug, Clone)]
pub struct Bridge {
    conn: Arc<ConnectionManager>,
    monitor: TrafficMonitor,
    settings: BridgeSettings,
}

impl Bridge {
    pub fn new(conn: Arc<ConnectionManager>, monitor: TrafficMonitor, settings: BridgeSettings) -> Self {
        Self {
            conn,
            monitor,
            settings,
        }
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.conn
    }

    /// Run one session until either direction finishes.
    pub async fn run_session<W, R, E>(&self, sink: W, stream: R) -> SessionEnd
    where
        W: Sink<Message> + Unpin,
        W::Error: Display,
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        if let Err(e) = self.conn.ensure_connected_async().await {
            warn!("Serial unavailable at session start: {}", e);
        }

        let end = tokio::select! {
            end = self.downlink(stream) => {
                debug!("downlink finished first, cancelling uplink");
                end
            }
            end = self.uplink(sink) => {
                debug!("uplink finished first, cancelling downlink");
                end
            }
        };

        info!("Session ended: {:?}", end);
        end
    }

    /// Browser to device. Returns when the client goes away.
    pub async fn downlink<R, E>(&self, mut stream: R) -> SessionEnd
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        loop {
            let message = match stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return SessionEnd::ReceiveFailed(e.to_string()),
                None => return SessionEnd::ClientClosed,
            };

            let payload = match message {
                Message::Text(text) => {
                    if !text.as_str().is_ascii() {
                        warn!("failing on encode: message is not ASCII");
                        self.conn.close();
                        continue;
                    }
                    text.as_str().as_bytes().to_vec()
                }
                Message::Binary(bytes) => bytes.to_vec(),
                Message::Close(_) => return SessionEnd::ClientClosed,
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            if let Err(e) = self.conn.ensure_connected_async().await {
                warn!("Dropping {} byte message, serial unavailable: {}", payload.len(), e);
                continue;
            }

            if self.monitor.is_enabled() {
                if self.conn.write_async(payload.clone()).await.is_ok() {
                    self.monitor.record(Direction::Down, &payload);
                }
            } else {
                // Failures already closed the handle; the next message reconnects
                let _ = self.conn.write_async(payload).await;
            }
        }
    }

    /// Device to browser. Returns when a send to the client fails.
    pub async fn uplink<W>(&self, mut sink: W) -> SessionEnd
    where
        W: Sink<Message> + Unpin,
        W::Error: Display,
    {
        loop {
            if let Err(e) = self.conn.ensure_connected_async().await {
                warn!("Reconnect failed: {}", e);
                tokio::time::sleep(self.settings.read_backoff).await;
                continue;
            }

            let data = match self.conn.read_async(self.settings.chunk_size).await {
                Ok(data) => {
                    // Let a pending downlink write in before the next read
                    tokio::task::yield_now().await;
                    data
                }
                Err(_) => {
                    tokio::time::sleep(self.settings.read_backoff).await;
                    Vec::new()
                }
            };

            self.monitor.record(Direction::Up, &data);

            if let Err(e) = sink.send(Message::Binary(data.into())).await {
                return SessionEnd::SendFailed(e.to_string());
            }
        }
    }
}
