//! Photon Core
//!
//! Provider-agnostic building blocks for the live voice relay: the session
//! configuration sent upstream, the events that come back, and the traits an
//! upstream real-time client has to implement.

pub mod generic_types;
pub mod realtime_api;
pub mod tools;

/// Sample rate of the PCM16 audio the browser streams in.
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of the PCM16 audio the upstream model speaks back.
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Default upstream model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-native-audio-preview-12-2025";

/// Default reasoning budget, in tokens.
pub const DEFAULT_THINKING_BUDGET: u32 = 1024;
