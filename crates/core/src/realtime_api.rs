use crate::generic_types::{AudioFrame, FunctionResponse, LiveSessionConfig, ResponseEvent};
use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// The events of a single upstream turn, in arrival order.
///
/// The stream ends after the event that completes the turn. An `Err` item
/// means the upstream connection is no longer usable.
pub type TurnStream = Pin<Box<dyn Stream<Item = Result<ResponseEvent>> + Send>>;

/// Opens upstream live sessions.
#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    /// Connects to the provider and completes its setup handshake.
    async fn connect(&self, config: &LiveSessionConfig) -> Result<Arc<dyn UpstreamSession>>;
}

/// A connected, bidirectional session with a real-time speech provider.
///
/// Sends take `&self` so audio can be forwarded while a turn is being
/// received on another task.
#[async_trait]
pub trait UpstreamSession: Send + Sync {
    /// Streams one chunk of realtime audio input.
    async fn send_audio_frame(&self, frame: AudioFrame) -> Result<()>;

    /// Signals that the user has stopped speaking.
    async fn send_end_of_turn(&self) -> Result<()>;

    /// Sends a complete user turn as text.
    async fn send_text_turn(&self, text: &str) -> Result<()>;

    /// Replies to a batch of function calls in one message.
    async fn send_tool_responses(&self, responses: Vec<FunctionResponse>) -> Result<()>;

    /// Opens a stream over the next turn's events.
    async fn receive_turn(&self) -> Result<TurnStream>;

    /// Closes the connection.
    async fn close(&self) -> Result<()>;
}
