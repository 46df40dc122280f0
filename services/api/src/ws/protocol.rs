//! Defines the WebSocket message protocol between the browser client and the API server.

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A chunk of microphone audio, base64 encoded PCM16 at 16 kHz.
    AudioChunk {
        #[serde(default)]
        data: Option<String>,
    },
    /// The user stopped speaking.
    EndOfTurn,
    /// A complete typed user turn.
    TextMessage {
        #[serde(default, deserialize_with = "null_as_empty")]
        text: String,
    },
    /// Ends the session.
    Stop,
    /// Any other `type`. Ignored.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parses one text frame.
    ///
    /// Anything that is not a JSON object is an error. An object without a
    /// string `type` is treated like an unknown type.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        let Some(fields) = value.as_object() else {
            return Err(serde_json::Error::custom("expected a JSON object"));
        };
        if !fields.get("type").is_some_and(Value::is_string) {
            return Ok(ClientMessage::Unknown);
        }
        serde_json::from_value(value)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The upstream session is ready.
    Connected { message: String },
    /// The model invoked one of the declared tools.
    ToolCall { tool: String, args: Value },
    /// A chunk of the model's voice (base64 encoded PCM16 at 24 kHz).
    AudioResponse { data: String },
    /// Text attributed to the user's side of the conversation.
    Transcription { text: String },
    /// Transcription of the model's spoken output.
    AiTranscription { text: String },
    TurnComplete,
    /// The user barged in; queued playback should be dropped.
    Interrupted,
    /// Reports a fatal error to the client.
    Error { message: String },
}
