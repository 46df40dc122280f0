//! API Models
//!
//! This module defines the data structures returned by the REST API and used
//! for generating OpenAPI documentation with `utoipa`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    /// Whether an upstream API key was provided at startup.
    pub api_key_configured: bool,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy(api_key_configured: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            api_key_configured,
            timestamp: Utc::now(),
        }
    }
}
