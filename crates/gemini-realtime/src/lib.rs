//! Gemini Live client.
//!
//! Implements [`photon_core::realtime_api::UpstreamConnector`] and
//! [`photon_core::realtime_api::UpstreamSession`] over the
//! `BidiGenerateContent` WebSocket endpoint.

mod client;
mod error;
pub mod types;

pub use client::{GeminiLiveConnector, GeminiLiveSession};
pub use error::LiveError;

/// Host serving the Live API WebSocket endpoint.
pub const DEFAULT_BASE_URL: &str = "wss://generativelanguage.googleapis.com";

/// API version; proactive audio is only available on `v1alpha`.
pub const DEFAULT_API_VERSION: &str = "v1alpha";
