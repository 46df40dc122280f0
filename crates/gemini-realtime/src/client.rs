//! WebSocket transport for the Gemini Live API.

use crate::{
    DEFAULT_API_VERSION, DEFAULT_BASE_URL,
    error::LiveError,
    types::{ClientMessage, ServerMessage, Setup},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{
    SinkExt, StreamExt,
    stream::{self, SplitSink, SplitStream},
};
use photon_core::{
    generic_types::{AudioFrame, FunctionResponse, LiveSessionConfig, ResponseEvent},
    realtime_api::{TurnStream, UpstreamConnector, UpstreamSession},
};
use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message as WsMessage,
};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens Gemini Live sessions.
#[derive(Debug)]
pub struct GeminiLiveConnector {
    api_key: SecretString,
    base_url: String,
    api_version: String,
    setup_timeout: Duration,
}

impl GeminiLiveConnector {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
        }
    }

    /// Overrides the scheme and host, e.g. to go through a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }

    // Carries the API key; never log it.
    fn endpoint(&self) -> String {
        format!(
            "{}/ws/google.ai.generativelanguage.{}.GenerativeService.BidiGenerateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.api_version,
            self.api_key.expose_secret()
        )
    }
}

#[async_trait]
impl UpstreamConnector for GeminiLiveConnector {
    async fn connect(&self, config: &LiveSessionConfig) -> Result<Arc<dyn UpstreamSession>> {
        info!(model = %config.model, api_version = %self.api_version, "Connecting to Gemini Live");
        let (ws_stream, _) = connect_async(self.endpoint())
            .await
            .context("Failed to connect to Gemini Live WebSocket")?;
        let (mut tx, mut rx) = ws_stream.split();

        let setup = ClientMessage::Setup(Setup::from(config));
        tx.send(WsMessage::Text(serde_json::to_string(&setup)?.into()))
            .await
            .context("Failed to send setup message")?;

        tokio::time::timeout(self.setup_timeout, wait_for_setup_complete(&mut rx))
            .await
            .map_err(|_| LiveError::SetupTimeout(self.setup_timeout))??;
        info!("Gemini Live setup complete.");

        Ok(Arc::new(GeminiLiveSession {
            tx: Mutex::new(tx),
            rx: Arc::new(Mutex::new(rx)),
        }))
    }
}

/// Reads frames until the server acknowledges the setup message.
async fn wait_for_setup_complete(rx: &mut SplitStream<WsStream>) -> Result<()> {
    while let Some(frame) = rx.next().await {
        match frame.context("Failed to read from Gemini Live during setup")? {
            WsMessage::Close(close_frame) => {
                return Err(
                    LiveError::ClosedBeforeSetup(close_frame.map(|f| f.reason.to_string())).into(),
                );
            }
            other => {
                if let Some(msg) = parse_frame(other)? {
                    if msg.setup_complete.is_some() {
                        return Ok(());
                    }
                    warn!(?msg, "Ignoring message received before setup completed");
                }
            }
        }
    }
    Err(LiveError::ClosedBeforeSetup(None).into())
}

/// Parses a data frame; control frames yield `None`.
fn parse_frame(frame: WsMessage) -> Result<Option<ServerMessage>> {
    let msg = match frame {
        WsMessage::Text(text) => serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse Gemini message: {}", text.as_str()))?,
        // The service delivers JSON in binary frames as well.
        WsMessage::Binary(bytes) => {
            serde_json::from_slice(&bytes).context("Failed to parse binary Gemini message")?
        }
        _ => return Ok(None),
    };
    Ok(Some(msg))
}

/// Turns a data frame into an event, skipping anything with nothing to relay.
fn decode_event(frame: WsMessage) -> Result<Option<ResponseEvent>> {
    let Some(msg) = parse_frame(frame)? else {
        return Ok(None);
    };

    if let Some(go_away) = &msg.go_away {
        warn!(time_left = ?go_away.time_left, "Gemini Live will close the connection soon");
    }
    if let Some(cancellation) = &msg.tool_call_cancellation {
        info!(ids = ?cancellation.ids, "Gemini cancelled pending tool calls");
    }
    if let Some(usage) = &msg.usage_metadata {
        debug!(%usage, "Gemini usage metadata");
    }

    let event = msg
        .into_event()
        .context("Gemini sent audio that is not valid base64")?;
    Ok((!event.is_empty()).then_some(event))
}

/// A connected Gemini Live session.
///
/// The socket is split so that sends never wait behind a pending receive.
pub struct GeminiLiveSession {
    tx: Mutex<SplitSink<WsStream, WsMessage>>,
    rx: Arc<Mutex<SplitStream<WsStream>>>,
}

impl GeminiLiveSession {
    async fn send(&self, msg: &ClientMessage) -> Result<()> {
        let payload = serde_json::to_string(msg)?;
        self.tx
            .lock()
            .await
            .send(WsMessage::Text(payload.into()))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UpstreamSession for GeminiLiveSession {
    async fn send_audio_frame(&self, frame: AudioFrame) -> Result<()> {
        self.send(&ClientMessage::audio(&frame)).await
    }

    async fn send_end_of_turn(&self) -> Result<()> {
        self.send(&ClientMessage::audio_stream_end()).await
    }

    async fn send_text_turn(&self, text: &str) -> Result<()> {
        self.send(&ClientMessage::user_text(text)).await
    }

    async fn send_tool_responses(&self, responses: Vec<FunctionResponse>) -> Result<()> {
        self.send(&ClientMessage::tool_responses(responses)).await
    }

    async fn receive_turn(&self) -> Result<TurnStream> {
        let rx = self.rx.clone().lock_owned().await;

        // The receive half stays locked until the turn completes or fails.
        let turn = stream::unfold(Some(rx), |state| async move {
            let mut rx = state?;
            loop {
                let next: Result<ResponseEvent> = match rx.next().await {
                    None => Err(LiveError::Closed(None).into()),
                    Some(Err(e)) => Err(anyhow::Error::from(e).context("Gemini Live read failed")),
                    Some(Ok(WsMessage::Close(close_frame))) => {
                        Err(LiveError::Closed(close_frame.map(|f| f.reason.to_string())).into())
                    }
                    Some(Ok(frame)) => match decode_event(frame) {
                        Ok(Some(event)) => Ok(event),
                        Ok(None) => continue,
                        Err(e) => Err(e),
                    },
                };
                return match next {
                    Ok(event) => {
                        let done = event.turn_complete;
                        Some((Ok(event), (!done).then_some(rx)))
                    }
                    Err(e) => Some((Err(e), None)),
                };
            }
        });
        Ok(Box::pin(turn))
    }

    async fn close(&self) -> Result<()> {
        self.tx
            .lock()
            .await
            .close()
            .await
            .context("Failed to close Gemini Live connection")?;
        Ok(())
    }
}
