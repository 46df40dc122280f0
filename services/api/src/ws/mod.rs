//! WebSocket Relay
//!
//! This module contains the logic that bridges a browser audio client and a
//! Gemini Live session. It is structured into submodules:
//!
//! - `protocol`: Defines the JSON message format spoken with the browser.
//! - `transport`: The client-facing sink the relay writes through.
//! - `relay`: The per-connection session coordinator and its two relay loops.
//! - `tool_call`: Acknowledges function calls from the model.
//! - `session`: Manages the WebSocket connection lifecycle, from upgrade to teardown.

pub mod protocol;
pub mod relay;
pub mod session;
mod tool_call;
pub mod transport;

#[cfg(test)]
mod testing;

pub use session::ws_handler;
