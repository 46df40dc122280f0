//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like the configuration and the upstream connector.

use crate::{config::Config, ws::relay::RelaySettings};
use photon_core::realtime_api::UpstreamConnector;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub connector: Arc<dyn UpstreamConnector>,
    pub system_prompt: Arc<String>,
}

impl AppState {
    /// The per-session settings every new relay session is built from.
    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            model: self.config.model.clone(),
            system_prompt: self.system_prompt.clone(),
            thinking_budget: self.config.thinking_budget,
        }
    }
}
