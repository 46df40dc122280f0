//! Wire types for the `BidiGenerateContent` protocol.

use base64::Engine;
use photon_core::generic_types::{
    AudioFrame, Behavior, FunctionCall, FunctionResponse, LiveSessionConfig, Modality,
    ResponseEvent,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

// --- Client -> server ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
    ClientContent(ClientContent),
    ToolResponse(ToolResponse),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<AudioTranscriptionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<AudioTranscriptionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proactivity: Option<ProactivityConfig>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<Modality>,
    pub thinking_config: ThinkingConfig,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub include_thoughts: bool,
    pub thinking_budget: u32,
}

/// Presence alone enables transcription; the object has no fields.
#[derive(Serialize, Debug, Default)]
pub struct AudioTranscriptionConfig {}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProactivityConfig {
    pub proactive_audio: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize, Debug)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub behavior: Behavior,
}

#[derive(Serialize, Debug)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
pub struct Part {
    pub text: String,
}

#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_stream_end: Option<bool>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<WireFunctionResponse>,
}

#[derive(Serialize, Debug)]
pub struct WireFunctionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

impl From<&LiveSessionConfig> for Setup {
    fn from(config: &LiveSessionConfig) -> Self {
        let model = if config.model.starts_with("models/") {
            config.model.clone()
        } else {
            format!("models/{}", config.model)
        };
        let function_declarations = config
            .tools
            .iter()
            .map(|t| FunctionDeclaration {
                name: t.name.clone(),
                description: t.description.clone(),
                behavior: t.behavior,
            })
            .collect();

        Self {
            model,
            generation_config: GenerationConfig {
                response_modalities: config.response_modalities.clone(),
                thinking_config: ThinkingConfig {
                    include_thoughts: config.thinking.include_thoughts,
                    thinking_budget: config.thinking.budget,
                },
            },
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: config.system_instruction.clone(),
                }],
            },
            tools: vec![Tool {
                function_declarations,
            }],
            input_audio_transcription: config
                .input_audio_transcription
                .then(AudioTranscriptionConfig::default),
            output_audio_transcription: config
                .output_audio_transcription
                .then(AudioTranscriptionConfig::default),
            proactivity: config.proactive_audio.then_some(ProactivityConfig {
                proactive_audio: true,
            }),
        }
    }
}

impl ClientMessage {
    pub fn audio(frame: &AudioFrame) -> Self {
        Self::RealtimeInput(RealtimeInput {
            audio: Some(Blob {
                mime_type: frame.mime_type(),
                data: base64::engine::general_purpose::STANDARD.encode(&frame.data),
            }),
            ..Default::default()
        })
    }

    pub fn audio_stream_end() -> Self {
        Self::RealtimeInput(RealtimeInput {
            audio_stream_end: Some(true),
            ..Default::default()
        })
    }

    pub fn user_text(text: &str) -> Self {
        Self::ClientContent(ClientContent {
            turns: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: text.to_string(),
                }],
            }],
            turn_complete: true,
        })
    }

    pub fn tool_responses(responses: Vec<FunctionResponse>) -> Self {
        Self::ToolResponse(ToolResponse {
            function_responses: responses
                .into_iter()
                .map(|r| WireFunctionResponse {
                    id: r.id,
                    name: r.name,
                    // The scheduling hint travels inside the response payload.
                    response: json!({ "result": r.result, "scheduling": r.scheduling }),
                })
                .collect(),
        })
    }
}

// --- Server -> client ---

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<Value>,
    pub server_content: Option<LiveServerContent>,
    pub tool_call: Option<ToolCall>,
    pub tool_call_cancellation: Option<ToolCallCancellation>,
    pub go_away: Option<GoAway>,
    pub usage_metadata: Option<Value>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct LiveServerContent {
    pub model_turn: Option<ServerContentTurn>,
    pub turn_complete: Option<bool>,
    pub interrupted: Option<bool>,
    pub generation_complete: Option<bool>,
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
}

#[derive(Deserialize, Debug)]
pub struct ServerContentTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    pub text: Option<String>,
    pub inline_data: Option<ServerBlob>,
    #[serde(default)]
    pub thought: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServerBlob {
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Deserialize, Debug)]
pub struct Transcription {
    pub text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<WireFunctionCall>,
}

#[derive(Deserialize, Debug)]
pub struct WireFunctionCall {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Deserialize, Debug)]
pub struct ToolCallCancellation {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    pub time_left: Option<String>,
}

impl ServerMessage {
    /// Flattens the message into a [`ResponseEvent`].
    ///
    /// Audio from every `inlineData` part is concatenated, as is the text of
    /// every non-thought part. Thought parts are dropped.
    pub fn into_event(self) -> Result<ResponseEvent, base64::DecodeError> {
        let mut event = ResponseEvent {
            tool_call: self.tool_call.map(|tc| {
                tc.function_calls
                    .into_iter()
                    .map(|fc| FunctionCall {
                        id: fc.id,
                        name: fc.name,
                        args: fc.args,
                    })
                    .collect()
            }),
            ..Default::default()
        };

        let Some(content) = self.server_content else {
            return Ok(event);
        };

        if let Some(turn) = content.model_turn {
            let mut audio: Option<Vec<u8>> = None;
            let mut text: Option<String> = None;
            for part in turn.parts {
                if let Some(blob) = part.inline_data {
                    let bytes = base64::engine::general_purpose::STANDARD.decode(&blob.data)?;
                    audio.get_or_insert_with(Vec::new).extend_from_slice(&bytes);
                }
                match part.text {
                    Some(thought) if part.thought => debug!(%thought, "Model thought"),
                    Some(fragment) => text.get_or_insert_with(String::new).push_str(&fragment),
                    None => {}
                }
            }
            event.data = audio;
            event.text = text;
        }

        event.input_transcription = content.input_transcription.and_then(|t| t.text);
        event.output_transcription = content.output_transcription.and_then(|t| t.text);
        event.turn_complete = content.turn_complete.unwrap_or(false);
        event.interrupted = content.interrupted.unwrap_or(false);
        Ok(event)
    }
}
