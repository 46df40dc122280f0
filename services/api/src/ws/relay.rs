//! The per-connection session coordinator.
//!
//! A [`RelaySession`] owns exactly one upstream live session and runs two
//! loops against it: the inbound loop (browser to Gemini) on the connection's
//! own task and the outbound loop (Gemini to browser) on a spawned task.
//! They share an `active` flag that only ever goes from true to false; once
//! either side fails, the other winds down at its next check.

use super::{
    protocol::{ClientMessage, ServerMessage},
    tool_call::handle_tool_calls,
    transport::ClientSink,
};
use crate::audio_utils::{decode_pcm_base64, encode_pcm_base64, pcm16_duration_ms};
use anyhow::{Context, Result};
use axum::extract::ws::Message;
use futures_util::{Stream, StreamExt};
use photon_core::{
    INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE,
    generic_types::{AudioFrame, LiveSessionConfig, ResponseEvent},
    realtime_api::{UpstreamConnector, UpstreamSession},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of a [`RelaySession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Active,
    Closing,
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("session cannot connect while {0:?}")]
    AlreadyConnected(SessionState),
    #[error("session was closed while connecting")]
    ClosedWhileConnecting,
    #[error("no upstream session")]
    NotConnected,
    #[error("failed to connect to Gemini: {0}")]
    Connect(#[source] anyhow::Error),
    #[error("failed to notify client: {0}")]
    Client(#[source] anyhow::Error),
}

/// Why the inbound loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundExit {
    /// The client sent `stop`.
    Stop,
    /// Close frame, end of stream or a transport error.
    Disconnected,
    /// A frame that does not follow the client protocol.
    Malformed,
    /// Forwarding a message upstream failed.
    Failed,
    /// The session was marked inactive.
    Inactive,
}

/// Settings shared by every session the server opens.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub model: String,
    pub system_prompt: Arc<String>,
    pub thinking_budget: u32,
}

struct Inner {
    state: SessionState,
    upstream: Option<Arc<dyn UpstreamSession>>,
    outbound: Option<(JoinHandle<()>, CancellationToken)>,
}

pub struct RelaySession {
    id: u32,
    connector: Arc<dyn UpstreamConnector>,
    settings: RelaySettings,
    client: Arc<dyn ClientSink>,
    active: AtomicBool,
    /// Fires when the session goes inactive so a pending inbound read wakes up.
    ended: CancellationToken,
    inner: Mutex<Inner>,
}

impl RelaySession {
    pub fn new(
        id: u32,
        connector: Arc<dyn UpstreamConnector>,
        settings: RelaySettings,
        client: Arc<dyn ClientSink>,
    ) -> Self {
        Self {
            id,
            connector,
            settings,
            client,
            active: AtomicBool::new(false),
            ended: CancellationToken::new(),
            inner: Mutex::new(Inner {
                state: SessionState::Disconnected,
                upstream: None,
                outbound: None,
            }),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub(crate) fn mark_inactive(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.ended.cancel();
    }

    async fn upstream(&self) -> Option<Arc<dyn UpstreamSession>> {
        self.inner.lock().await.upstream.clone()
    }

    /// Opens the upstream session and tells the client it is ready.
    ///
    /// Only valid on a fresh session. On failure the session is back in
    /// [`SessionState::Disconnected`] and holds no upstream handle.
    pub async fn connect(&self) -> Result<(), RelayError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state != SessionState::Disconnected {
                return Err(RelayError::AlreadyConnected(inner.state));
            }
            inner.state = SessionState::Connecting;
        }

        let config = LiveSessionConfig::voice_assistant(
            &self.settings.model,
            self.settings.system_prompt.as_str(),
            self.settings.thinking_budget,
        );
        info!(model = %config.model, "Connecting to Gemini");

        let upstream = match self.connector.connect(&config).await {
            Ok(upstream) => upstream,
            Err(e) => {
                let mut inner = self.inner.lock().await;
                if inner.state == SessionState::Connecting {
                    inner.state = SessionState::Disconnected;
                }
                return Err(RelayError::Connect(e));
            }
        };

        {
            let mut inner = self.inner.lock().await;
            if inner.state != SessionState::Connecting {
                drop(inner);
                if let Err(e) = upstream.close().await {
                    error!(error = ?e, "Error closing session");
                }
                return Err(RelayError::ClosedWhileConnecting);
            }
            inner.upstream = Some(upstream);
            inner.state = SessionState::Active;
            // Under the lock so a concurrent close() always observes it.
            self.active.store(true, Ordering::SeqCst);
        }
        info!("Connected to Gemini Live API");

        self.client
            .send(ServerMessage::Connected {
                message: "Successfully connected to Gemini".to_string(),
            })
            .await
            .map_err(RelayError::Client)
    }

    /// Tears the session down. Safe to call any number of times; the
    /// upstream handle is released on the first call only.
    pub async fn close(&self) {
        self.mark_inactive();
        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                SessionState::Closed => {
                    debug!("Session already closed");
                    return;
                }
                SessionState::Active => inner.state = SessionState::Closing,
                _ => {}
            }
        }

        self.stop_outbound().await;

        let upstream = self.inner.lock().await.upstream.take();
        if let Some(upstream) = upstream {
            match upstream.close().await {
                Ok(()) => info!("Closed Gemini session"),
                Err(e) => error!(error = ?e, "Error closing session"),
            }
        }
        self.inner.lock().await.state = SessionState::Closed;
    }

    /// Forwards one chunk of microphone audio.
    ///
    /// Dropped with a warning when there is nothing to forward to. A failed
    /// send ends the session.
    pub async fn send_audio(&self, pcm: Vec<u8>) {
        let upstream = match self.upstream().await {
            Some(upstream) if self.is_active() => upstream,
            _ => {
                warn!("Cannot send audio, session not active");
                return;
            }
        };

        let len = pcm.len();
        if let Err(e) = upstream
            .send_audio_frame(AudioFrame::pcm(pcm, INPUT_SAMPLE_RATE))
            .await
        {
            error!(error = ?e, "Error sending audio to Gemini");
            self.mark_inactive();
            return;
        }
        debug!(
            bytes = len,
            ms = pcm16_duration_ms(len, INPUT_SAMPLE_RATE),
            "Sent audio to Gemini"
        );
    }

    /// Signals the end of the user's speech. Failures are logged only.
    pub async fn end_turn(&self) {
        let Some(upstream) = self.upstream().await else {
            debug!("No upstream session, skipping end of turn");
            return;
        };

        info!("User finished speaking, sending audio stream end");
        match upstream.send_end_of_turn().await {
            Ok(()) => info!("Sent audio stream end"),
            Err(e) => error!(error = ?e, "Error sending end of turn"),
        }
    }

    /// Sends a typed message as a complete user turn.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        let upstream = self.upstream().await.ok_or(RelayError::NotConnected)?;
        upstream
            .send_text_turn(text)
            .await
            .context("Failed to send text turn")
    }

    /// Relays client frames upstream until the client stops, disconnects or
    /// misbehaves, or the session goes inactive.
    pub async fn run_inbound<S>(&self, mut incoming: S) -> InboundExit
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin + Send,
    {
        loop {
            if !self.is_active() {
                return InboundExit::Inactive;
            }

            let next = tokio::select! {
                _ = self.ended.cancelled() => return InboundExit::Inactive,
                next = incoming.next() => next,
            };

            let text = match next {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Binary(_))) => {
                    error!("Received a binary frame, expected JSON text");
                    return InboundExit::Malformed;
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client disconnected");
                    return InboundExit::Disconnected;
                }
                Some(Err(e)) => {
                    info!(error = %e, "Client disconnected");
                    return InboundExit::Disconnected;
                }
            };

            let msg = match ClientMessage::parse(text.as_str()) {
                Ok(msg) => msg,
                Err(e) => {
                    error!(error = %e, "Error processing client message");
                    return InboundExit::Malformed;
                }
            };

            match msg {
                ClientMessage::AudioChunk { data: Some(encoded) } if !encoded.is_empty() => {
                    debug!(len = encoded.len(), "Received audio chunk");
                    match decode_pcm_base64(&encoded) {
                        Ok(pcm) => self.send_audio(pcm).await,
                        Err(e) => {
                            error!(error = %e, "Error decoding audio chunk");
                            return InboundExit::Malformed;
                        }
                    }
                }
                ClientMessage::AudioChunk { .. } => {}
                ClientMessage::EndOfTurn => self.end_turn().await,
                ClientMessage::TextMessage { text } if !text.is_empty() => {
                    info!(%text, "Received text message");
                    if let Err(e) = self.send_text(&text).await {
                        error!(error = ?e, "Error processing client message");
                        return InboundExit::Failed;
                    }
                }
                ClientMessage::TextMessage { .. } => {}
                ClientMessage::Stop => {
                    info!("Client requested stop");
                    return InboundExit::Stop;
                }
                ClientMessage::Unknown => debug!("Ignoring client message of unknown type"),
            }
        }
    }

    /// Starts the outbound loop on its own task. No-op if one is running.
    pub async fn spawn_outbound(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        if inner.outbound.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let session = Arc::clone(self);
        let token = cancel.clone();
        let handle = tokio::spawn(async move { session.run_outbound(token).await });
        inner.outbound = Some((handle, cancel));
    }

    /// Cancels the outbound task and waits for it to finish.
    pub async fn stop_outbound(&self) {
        let outbound = self.inner.lock().await.outbound.take();
        if let Some((handle, cancel)) = outbound {
            cancel.cancel();
            if let Err(e) = handle.await {
                error!(error = %e, "Outbound relay task failed");
            }
        }
    }

    /// Relays upstream turns to the client until cancelled or until
    /// anything on the way fails, which ends the session.
    pub async fn run_outbound(&self, cancel: CancellationToken) {
        let Some(upstream) = self.upstream().await else {
            warn!("No upstream session, outbound relay not started");
            return;
        };

        if let Err(e) = self.relay_turns(upstream.as_ref(), &cancel).await {
            error!(error = ?e, "Error receiving from Gemini");
            self.mark_inactive();
        }
        debug!("Outbound relay finished");
    }

    async fn relay_turns(
        &self,
        upstream: &dyn UpstreamSession,
        cancel: &CancellationToken,
    ) -> Result<()> {
        while self.is_active() {
            let mut turn = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                turn = upstream.receive_turn() => turn?,
            };

            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    event = turn.next() => event,
                };
                let Some(event) = event else { break };
                let event = event?;
                if !self.is_active() {
                    break;
                }
                self.forward_event(upstream, event).await?;
            }
        }
        Ok(())
    }

    /// Translates every populated field of `event`, in a fixed order.
    async fn forward_event(
        &self,
        upstream: &dyn UpstreamSession,
        event: ResponseEvent,
    ) -> Result<()> {
        if let Some(calls) = event.tool_call {
            handle_tool_calls(self.client.as_ref(), upstream, calls).await;
        }

        if let Some(data) = event.data.filter(|d| !d.is_empty()) {
            self.client
                .send(ServerMessage::AudioResponse {
                    data: encode_pcm_base64(&data),
                })
                .await?;
            debug!(
                bytes = data.len(),
                ms = pcm16_duration_ms(data.len(), OUTPUT_SAMPLE_RATE),
                "Sent audio response to client"
            );
        }

        if let Some(text) = event.text.filter(|t| !t.is_empty()) {
            info!(%text, "Gemini text");
            self.client.send(ServerMessage::Transcription { text }).await?;
        }

        if let Some(text) = event.input_transcription {
            self.client.send(ServerMessage::Transcription { text }).await?;
        }

        if let Some(text) = event.output_transcription {
            self.client
                .send(ServerMessage::AiTranscription { text })
                .await?;
        }

        if event.turn_complete {
            info!("Turn complete");
            self.client.send(ServerMessage::TurnComplete).await?;
        }

        if event.interrupted {
            info!("Generation interrupted");
            self.client.send(ServerMessage::Interrupted).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::testing::{FakeConnector, FakeUpstream, RecordingSink, ScriptedTurn};
    use anyhow::anyhow;
    use futures_util::stream;
    use photon_core::generic_types::FunctionCall;
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    struct Harness {
        session: Arc<RelaySession>,
        upstream: Arc<FakeUpstream>,
        connector: Arc<FakeConnector>,
        sink: Arc<RecordingSink>,
        turns: mpsc::UnboundedSender<ScriptedTurn>,
    }

    fn harness_with(failing: bool) -> Harness {
        let (upstream, turns) = FakeUpstream::new();
        let connector = Arc::new(if failing {
            FakeConnector::failing(upstream.clone())
        } else {
            FakeConnector::new(upstream.clone())
        });
        let sink = Arc::new(RecordingSink::default());
        let settings = RelaySettings {
            model: "gemini-test".to_string(),
            system_prompt: Arc::new("You are Photon.".to_string()),
            thinking_budget: 256,
        };
        let session = Arc::new(RelaySession::new(
            7,
            connector.clone(),
            settings,
            sink.clone(),
        ));
        Harness {
            session,
            upstream,
            connector,
            sink,
            turns,
        }
    }

    async fn connected() -> Harness {
        let h = harness_with(false);
        h.session.connect().await.unwrap();
        h
    }

    fn text(raw: &str) -> Result<Message, axum::Error> {
        Ok(Message::Text(raw.into()))
    }

    fn connected_msg() -> ServerMessage {
        ServerMessage::Connected {
            message: "Successfully connected to Gemini".to_string(),
        }
    }

    #[tokio::test]
    async fn test_connect_builds_voice_config() {
        let h = connected().await;

        assert!(h.session.is_active());
        assert_eq!(h.session.state().await, SessionState::Active);
        assert_eq!(h.sink.messages(), vec![connected_msg()]);

        let configs = h.connector.configs.lock().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].model, "gemini-test");
        assert_eq!(configs[0].system_instruction, "You are Photon.");
        assert_eq!(configs[0].thinking.budget, 256);
        assert_eq!(configs[0].tools.len(), 7);
    }

    #[tokio::test]
    async fn test_connect_twice_is_rejected() {
        let h = connected().await;

        let err = h.session.connect().await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::AlreadyConnected(SessionState::Active)
        ));
        assert_eq!(h.connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_resets_state() {
        let h = harness_with(true);

        let err = h.session.connect().await.unwrap_err();
        assert!(matches!(err, RelayError::Connect(_)));
        assert!(!h.session.is_active());
        assert_eq!(h.session.state().await, SessionState::Disconnected);
        assert!(h.sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let h = connected().await;

        h.session.close().await;
        h.session.close().await;

        assert_eq!(h.upstream.close_count(), 1);
        assert_eq!(h.session.state().await, SessionState::Closed);
        assert!(!h.session.is_active());
    }

    #[tokio::test]
    async fn test_close_before_connect_releases_nothing() {
        let h = harness_with(false);

        h.session.close().await;

        assert_eq!(h.upstream.close_count(), 0);
        assert_eq!(h.session.state().await, SessionState::Closed);
        assert!(h.session.connect().await.is_err());
    }

    #[tokio::test]
    async fn test_audio_while_inactive_is_dropped() {
        let h = harness_with(false);
        h.session.send_audio(vec![1, 2, 3, 4]).await;

        h.session.connect().await.unwrap();
        h.session.mark_inactive();
        h.session.send_audio(vec![1, 2, 3, 4]).await;

        assert!(h.upstream.recorded.lock().unwrap().audio.is_empty());
    }

    #[tokio::test]
    async fn test_audio_chunk_is_forwarded_as_input_pcm() {
        let h = connected().await;
        let incoming = stream::iter(vec![text(r#"{"type":"audio_chunk","data":"AEAAgA=="}"#)]);

        let exit = h.session.run_inbound(incoming).await;

        assert_eq!(exit, InboundExit::Disconnected);
        let recorded = h.upstream.recorded.lock().unwrap();
        assert_eq!(recorded.audio.len(), 1);
        assert_eq!(recorded.audio[0].sample_rate, 16_000);
        assert_eq!(recorded.audio[0].data, vec![0x00, 0x40, 0x00, 0x80]);
        assert_eq!(recorded.audio[0].mime_type(), "audio/pcm;rate=16000");
    }

    #[tokio::test]
    async fn test_audio_send_failure_deactivates() {
        let h = connected().await;
        h.upstream.fail_audio.store(true, Ordering::SeqCst);
        let incoming = stream::iter(vec![
            text(r#"{"type":"audio_chunk","data":"AEA="}"#),
            text(r#"{"type":"text_message","text":"never sent"}"#),
        ]);

        let exit = h.session.run_inbound(incoming).await;

        assert_eq!(exit, InboundExit::Inactive);
        assert!(!h.session.is_active());
        assert!(h.upstream.recorded.lock().unwrap().texts.is_empty());
    }

    #[tokio::test]
    async fn test_end_of_turn_failure_keeps_session() {
        let h = connected().await;
        h.upstream.fail_end_of_turn.store(true, Ordering::SeqCst);
        let incoming = stream::iter(vec![
            text(r#"{"type":"end_of_turn"}"#),
            text(r#"{"type":"text_message","text":"still here"}"#),
            text(r#"{"type":"stop"}"#),
        ]);

        let exit = h.session.run_inbound(incoming).await;

        assert_eq!(exit, InboundExit::Stop);
        assert!(h.session.is_active());
        assert_eq!(h.upstream.recorded.lock().unwrap().texts, vec!["still here"]);
    }

    #[tokio::test]
    async fn test_text_failure_ends_inbound() {
        let h = connected().await;
        h.upstream.fail_text.store(true, Ordering::SeqCst);
        let incoming = stream::iter(vec![text(r#"{"type":"text_message","text":"hello"}"#)]);

        assert_eq!(h.session.run_inbound(incoming).await, InboundExit::Failed);
    }

    #[tokio::test]
    async fn test_empty_payloads_and_unknown_types_are_ignored() {
        let h = connected().await;
        let incoming = stream::iter(vec![
            text(r#"{"type":"audio_chunk"}"#),
            text(r#"{"type":"audio_chunk","data":""}"#),
            text(r#"{"type":"text_message","text":""}"#),
            text(r#"{"type":"set_voice","voice":"Puck"}"#),
            text(r#"{"type":"end_of_turn"}"#),
            text(r#"{"type":"stop"}"#),
        ]);

        assert_eq!(h.session.run_inbound(incoming).await, InboundExit::Stop);
        let recorded = h.upstream.recorded.lock().unwrap();
        assert!(recorded.audio.is_empty());
        assert!(recorded.texts.is_empty());
        assert_eq!(recorded.end_of_turns, 1);
    }

    #[tokio::test]
    async fn test_objects_without_type_or_text_are_ignored() {
        let h = connected().await;
        let incoming = stream::iter(vec![
            text(r#"{"text":"no type field"}"#),
            text(r#"{"type":"text_message","text":null}"#),
            text(r#"{"type":"text_message","text":"hi"}"#),
            text(r#"{"type":"stop"}"#),
        ]);

        assert_eq!(h.session.run_inbound(incoming).await, InboundExit::Stop);
        assert_eq!(h.upstream.recorded.lock().unwrap().texts, vec!["hi"]);
    }

    #[tokio::test]
    async fn test_close_after_connect_leaves_session_inactive() {
        let h = connected().await;
        h.session.close().await;

        assert!(!h.session.is_active());
        assert!(h.session.connect().await.is_err());
        assert!(!h.session.is_active());
    }

    #[tokio::test]
    async fn test_malformed_frames_end_inbound() {
        let cases = vec![
            text("not json"),
            text("[1, 2]"),
            text(r#"{"type":"audio_chunk","data":"%%%"}"#),
            Ok(Message::Binary(vec![0u8, 1, 2].into())),
        ];

        for frame in cases {
            let h = connected().await;
            let incoming = stream::iter(vec![frame, text(r#"{"type":"stop"}"#)]);
            assert_eq!(h.session.run_inbound(incoming).await, InboundExit::Malformed);
        }
    }

    #[tokio::test]
    async fn test_inbound_wakes_when_outbound_fails() {
        let h = connected().await;
        let (_client_tx, client_rx) = mpsc::unbounded_channel::<Result<Message, axum::Error>>();
        h.turns.send(vec![Err(anyhow!("connection reset"))]).unwrap();

        h.session.spawn_outbound().await;
        let exit = h
            .session
            .run_inbound(UnboundedReceiverStream::new(client_rx))
            .await;

        assert_eq!(exit, InboundExit::Inactive);
        h.session.stop_outbound().await;
    }

    #[tokio::test]
    async fn test_output_transcription_then_turn_complete() {
        let h = connected().await;
        h.turns
            .send(vec![Ok(ResponseEvent {
                output_transcription: Some("Hello there".to_string()),
                turn_complete: true,
                ..Default::default()
            })])
            .unwrap();
        drop(h.turns);

        h.session.run_outbound(CancellationToken::new()).await;

        assert_eq!(
            h.sink.messages(),
            vec![
                connected_msg(),
                ServerMessage::AiTranscription {
                    text: "Hello there".to_string()
                },
                ServerMessage::TurnComplete,
            ]
        );
        // The closed script counts as a lost upstream connection.
        assert!(!h.session.is_active());
    }

    #[tokio::test]
    async fn test_event_fields_are_forwarded_in_order() {
        let h = connected().await;
        h.turns
            .send(vec![Ok(ResponseEvent {
                tool_call: Some(vec![FunctionCall {
                    id: Some("call-1".to_string()),
                    name: "adapt_tone".to_string(),
                    args: json!({}),
                }]),
                data: Some(vec![0x00, 0x40]),
                text: Some("Gemini says".to_string()),
                input_transcription: Some("user said".to_string()),
                output_transcription: Some("model said".to_string()),
                turn_complete: true,
                interrupted: true,
            })])
            .unwrap();
        drop(h.turns);

        h.session.run_outbound(CancellationToken::new()).await;

        assert_eq!(
            &h.sink.messages()[1..],
            &[
                ServerMessage::ToolCall {
                    tool: "adapt_tone".to_string(),
                    args: json!({}),
                },
                ServerMessage::AudioResponse {
                    data: "AEA=".to_string()
                },
                ServerMessage::Transcription {
                    text: "Gemini says".to_string()
                },
                ServerMessage::Transcription {
                    text: "user said".to_string()
                },
                ServerMessage::AiTranscription {
                    text: "model said".to_string()
                },
                ServerMessage::TurnComplete,
                ServerMessage::Interrupted,
            ]
        );
    }

    #[tokio::test]
    async fn test_interrupted_does_not_truncate_turn() {
        let h = connected().await;
        h.turns
            .send(vec![
                Ok(ResponseEvent {
                    data: Some(vec![0x01, 0x02]),
                    ..Default::default()
                }),
                Ok(ResponseEvent {
                    interrupted: true,
                    ..Default::default()
                }),
                Ok(ResponseEvent {
                    output_transcription: Some("anyway".to_string()),
                    ..Default::default()
                }),
                Ok(ResponseEvent {
                    turn_complete: true,
                    ..Default::default()
                }),
            ])
            .unwrap();
        drop(h.turns);

        h.session.run_outbound(CancellationToken::new()).await;

        assert_eq!(
            &h.sink.messages()[1..],
            &[
                ServerMessage::AudioResponse {
                    data: "AQI=".to_string()
                },
                ServerMessage::Interrupted,
                ServerMessage::AiTranscription {
                    text: "anyway".to_string()
                },
                ServerMessage::TurnComplete,
            ]
        );
    }

    #[tokio::test]
    async fn test_turns_are_consumed_sequentially() {
        let h = connected().await;
        for word in ["one", "two"] {
            h.turns
                .send(vec![Ok(ResponseEvent {
                    output_transcription: Some(word.to_string()),
                    turn_complete: true,
                    ..Default::default()
                })])
                .unwrap();
        }
        drop(h.turns);

        h.session.run_outbound(CancellationToken::new()).await;

        let transcripts: Vec<_> = h
            .sink
            .messages()
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::AiTranscription { text } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(transcripts, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_client_send_failure_ends_outbound() {
        let h = connected().await;
        h.sink.fail.store(true, Ordering::SeqCst);
        h.turns
            .send(vec![Ok(ResponseEvent {
                turn_complete: true,
                ..Default::default()
            })])
            .unwrap();

        h.session.run_outbound(CancellationToken::new()).await;

        assert!(!h.session.is_active());
    }

    #[tokio::test]
    async fn test_cancelled_outbound_stops_waiting() {
        let h = connected().await;

        h.session.spawn_outbound().await;
        h.session.stop_outbound().await;

        // Still active: cancellation is not a failure.
        assert!(h.session.is_active());
        h.turns
            .send(vec![Ok(ResponseEvent {
                turn_complete: true,
                ..Default::default()
            })])
            .unwrap();
        assert_eq!(h.sink.messages(), vec![connected_msg()]);
    }
}
