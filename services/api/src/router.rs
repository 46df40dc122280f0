//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the health check, WebSocket endpoint, and OpenAPI documentation.

use crate::{handlers, models::HealthResponse, state::AppState, ws::ws_handler};

use axum::{Router, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::health_check),
    components(schemas(HealthResponse)),
    tags(
        (name = "Photon API", description = "Live voice relay between a browser client and Gemini")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ws", get(ws_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_lists_health() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        let schemas = doc.components.expect("components").schemas;
        assert!(schemas.contains_key("HealthResponse"));
    }
}
