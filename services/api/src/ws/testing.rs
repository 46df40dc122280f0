//! In-memory stand-ins for the upstream provider and the browser socket.

use super::{protocol::ServerMessage, transport::ClientSink};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use futures_util::stream;
use photon_core::{
    generic_types::{AudioFrame, FunctionResponse, LiveSessionConfig, ResponseEvent},
    realtime_api::{TurnStream, UpstreamConnector, UpstreamSession},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::sync::mpsc;

pub type ScriptedTurn = Vec<Result<ResponseEvent>>;

#[derive(Default)]
pub struct Recorded {
    pub audio: Vec<AudioFrame>,
    pub end_of_turns: usize,
    pub texts: Vec<String>,
    pub tool_responses: Vec<Vec<FunctionResponse>>,
}

/// Records every send and plays back turns pushed through a channel.
///
/// `receive_turn` blocks until a turn is scripted and fails once the
/// script sender is dropped.
pub struct FakeUpstream {
    pub recorded: Mutex<Recorded>,
    turns: tokio::sync::Mutex<mpsc::UnboundedReceiver<ScriptedTurn>>,
    pub closes: AtomicUsize,
    pub fail_audio: AtomicBool,
    pub fail_end_of_turn: AtomicBool,
    pub fail_text: AtomicBool,
    pub fail_tool_responses: AtomicBool,
}

impl FakeUpstream {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<ScriptedTurn>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let upstream = Arc::new(Self {
            recorded: Mutex::new(Recorded::default()),
            turns: tokio::sync::Mutex::new(rx),
            closes: AtomicUsize::new(0),
            fail_audio: AtomicBool::new(false),
            fail_end_of_turn: AtomicBool::new(false),
            fail_text: AtomicBool::new(false),
            fail_tool_responses: AtomicBool::new(false),
        });
        (upstream, tx)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamSession for FakeUpstream {
    async fn send_audio_frame(&self, frame: AudioFrame) -> Result<()> {
        if self.fail_audio.load(Ordering::SeqCst) {
            bail!("audio rejected");
        }
        self.recorded.lock().unwrap().audio.push(frame);
        Ok(())
    }

    async fn send_end_of_turn(&self) -> Result<()> {
        if self.fail_end_of_turn.load(Ordering::SeqCst) {
            bail!("end of turn rejected");
        }
        self.recorded.lock().unwrap().end_of_turns += 1;
        Ok(())
    }

    async fn send_text_turn(&self, text: &str) -> Result<()> {
        if self.fail_text.load(Ordering::SeqCst) {
            bail!("text rejected");
        }
        self.recorded.lock().unwrap().texts.push(text.to_string());
        Ok(())
    }

    async fn send_tool_responses(&self, responses: Vec<FunctionResponse>) -> Result<()> {
        if self.fail_tool_responses.load(Ordering::SeqCst) {
            bail!("tool responses rejected");
        }
        self.recorded.lock().unwrap().tool_responses.push(responses);
        Ok(())
    }

    async fn receive_turn(&self) -> Result<TurnStream> {
        match self.turns.lock().await.recv().await {
            Some(events) => Ok(Box::pin(stream::iter(events))),
            None => Err(anyhow!("upstream connection closed")),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeConnector {
    upstream: Arc<FakeUpstream>,
    fail: bool,
    pub configs: Mutex<Vec<LiveSessionConfig>>,
}

impl FakeConnector {
    pub fn new(upstream: Arc<FakeUpstream>) -> Self {
        Self {
            upstream,
            fail: false,
            configs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(upstream: Arc<FakeUpstream>) -> Self {
        Self {
            fail: true,
            ..Self::new(upstream)
        }
    }

    pub fn connect_count(&self) -> usize {
        self.configs.lock().unwrap().len()
    }
}

#[async_trait]
impl UpstreamConnector for FakeConnector {
    async fn connect(&self, config: &LiveSessionConfig) -> Result<Arc<dyn UpstreamSession>> {
        self.configs.lock().unwrap().push(config.clone());
        if self.fail {
            bail!("connection refused");
        }
        Ok(self.upstream.clone() as Arc<dyn UpstreamSession>)
    }
}

/// Collects everything the relay sends to the browser.
#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<ServerMessage>>,
    pub closed: AtomicBool,
    pub fail: AtomicBool,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<ServerMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn send(&self, msg: ServerMessage) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("client socket closed");
        }
        self.messages.lock().unwrap().push(msg);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
