//! The client-facing half of a relayed connection.

use super::protocol::ServerMessage;
use anyhow::Result;
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, stream::SplitSink};
use tokio::sync::Mutex;
use tracing::debug;

/// Where the relay delivers messages for the browser.
///
/// Implementations must serialize concurrent sends: the tool-call path and
/// the audio path both write through the same sink.
#[async_trait]
pub trait ClientSink: Send + Sync {
    async fn send(&self, msg: ServerMessage) -> Result<()>;

    /// Sends a close frame. Errors are swallowed; the peer may already be gone.
    async fn close(&self);
}

/// A [`ClientSink`] over the write half of an axum WebSocket.
pub struct WebSocketSink {
    tx: Mutex<SplitSink<WebSocket, Message>>,
}

impl WebSocketSink {
    pub fn new(tx: SplitSink<WebSocket, Message>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

#[async_trait]
impl ClientSink for WebSocketSink {
    async fn send(&self, msg: ServerMessage) -> Result<()> {
        let serialized = serde_json::to_string(&msg)?;
        self.tx
            .lock()
            .await
            .send(Message::Text(serialized.into()))
            .await?;
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.tx.lock().await.close().await {
            debug!("Client socket already closed: {}", e);
        }
    }
}
