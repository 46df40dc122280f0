use std::time::Duration;

/// Failures specific to the Gemini Live connection.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    #[error("Connection closed before setup completed: {}", .0.as_deref().unwrap_or("no reason given"))]
    ClosedBeforeSetup(Option<String>),
    #[error("Setup did not complete within {0:?}")]
    SetupTimeout(Duration),
    #[error("Connection closed by server: {}", .0.as_deref().unwrap_or("no reason given"))]
    Closed(Option<String>),
}
