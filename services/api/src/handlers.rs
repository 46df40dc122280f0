//! Axum Handlers for the REST API
//!
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{extract::State, response::Json};
use std::sync::Arc;

use crate::{models::HealthResponse, state::AppState};

/// Report service liveness and whether the upstream API key is configured.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let api_key_configured = !state.config.google_api_key.is_empty();
    Json(HealthResponse::healthy(api_key_configured))
}
