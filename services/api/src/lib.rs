//! Photon API Library Crate
//!
//! This library contains all the logic for the Photon live voice relay,
//! including configuration, the application state, the health endpoint and
//! the WebSocket relay. The binaries are thin wrappers around this library.

pub mod audio_utils;
pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
