use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools;

/// Output modality requested from the upstream model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Audio,
}

/// How the upstream model treats a declared function while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Behavior {
    /// Generation pauses until the function result arrives.
    Blocking,
    /// Generation continues; the result is folded in whenever it arrives.
    NonBlocking,
}

/// When the upstream model should act on a function response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scheduling {
    Interrupt,
    WhenIdle,
    /// Absorb the result without producing any output.
    Silent,
}

/// A function the upstream model may call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub behavior: Behavior,
}

/// Reasoning settings for models that support thinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkingConfig {
    pub include_thoughts: bool,
    pub budget: u32,
}

/// Immutable configuration for a single upstream live session.
///
/// Built once per client connection and handed to the connector; nothing
/// in it changes for the lifetime of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSessionConfig {
    pub model: String,
    pub response_modalities: Vec<Modality>,
    pub system_instruction: String,
    pub tools: Vec<ToolDeclaration>,
    pub input_audio_transcription: bool,
    pub output_audio_transcription: bool,
    /// Lets the model start speaking without an explicit end of turn.
    pub proactive_audio: bool,
    pub thinking: ThinkingConfig,
}

impl LiveSessionConfig {
    /// The configuration used for every relayed voice session: audio out,
    /// both transcriptions on, proactive audio and the fixed tool catalog.
    pub fn voice_assistant(
        model: impl Into<String>,
        system_instruction: impl Into<String>,
        thinking_budget: u32,
    ) -> Self {
        Self {
            model: model.into(),
            response_modalities: vec![Modality::Audio],
            system_instruction: system_instruction.into(),
            tools: tools::declarations(),
            input_audio_transcription: true,
            output_audio_transcription: true,
            proactive_audio: true,
            thinking: ThinkingConfig {
                include_thoughts: true,
                budget: thinking_budget,
            },
        }
    }
}

/// A chunk of raw PCM16 audio tagged with its sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub data: Vec<u8>,
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn pcm(data: Vec<u8>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    /// MIME type understood by the upstream service, e.g. `audio/pcm;rate=16000`.
    pub fn mime_type(&self) -> String {
        format!("audio/pcm;rate={}", self.sample_rate)
    }
}

/// A function invocation requested by the upstream model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub id: Option<String>,
    pub name: String,
    pub args: Value,
}

/// The reply to a [`FunctionCall`]; `id` and `name` echo the request.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub id: Option<String>,
    pub name: String,
    pub result: Value,
    pub scheduling: Scheduling,
}

impl FunctionResponse {
    /// A successful, silent acknowledgement of `call`.
    pub fn silent_ack(call: &FunctionCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            result: Value::String("ok".to_string()),
            scheduling: Scheduling::Silent,
        }
    }
}

/// One message received from the upstream session.
///
/// Fields are independent: a single event can carry audio, a transcript
/// fragment and the turn-complete flag at the same time, so consumers must
/// test each one rather than match on a single kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseEvent {
    pub tool_call: Option<Vec<FunctionCall>>,
    /// Raw PCM16 audio at [`crate::OUTPUT_SAMPLE_RATE`].
    pub data: Option<Vec<u8>>,
    pub text: Option<String>,
    pub input_transcription: Option<String>,
    pub output_transcription: Option<String>,
    pub turn_complete: bool,
    pub interrupted: bool,
}

impl ResponseEvent {
    /// True when no field is populated.
    pub fn is_empty(&self) -> bool {
        self.tool_call.is_none()
            && self.data.is_none()
            && self.text.is_none()
            && self.input_transcription.is_none()
            && self.output_transcription.is_none()
            && !self.turn_complete
            && !self.interrupted
    }
}
