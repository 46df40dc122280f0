//! Answers function calls from the upstream model.
//!
//! The declared tools carry no side effects. Each call is surfaced to the
//! browser and acknowledged silently so the model keeps talking.

use super::{protocol::ServerMessage, transport::ClientSink};
use anyhow::{Context, Result};
use photon_core::{
    generic_types::{FunctionCall, FunctionResponse},
    realtime_api::UpstreamSession,
};
use tracing::{error, info};

/// Notifies the client of every call in the batch, then replies to all of
/// them upstream in one message. Failures are logged and never propagate.
pub async fn handle_tool_calls(
    client: &dyn ClientSink,
    upstream: &dyn UpstreamSession,
    calls: Vec<FunctionCall>,
) {
    if let Err(e) = acknowledge_calls(client, upstream, &calls).await {
        error!(error = ?e, "Error handling tool call");
    }
}

async fn acknowledge_calls(
    client: &dyn ClientSink,
    upstream: &dyn UpstreamSession,
    calls: &[FunctionCall],
) -> Result<()> {
    let mut responses = Vec::with_capacity(calls.len());
    for call in calls {
        info!(tool = %call.name, args = %call.args, "Tool call received");
        client
            .send(ServerMessage::ToolCall {
                tool: call.name.clone(),
                args: call.args.clone(),
            })
            .await
            .context("Failed to notify client of tool call")?;
        responses.push(FunctionResponse::silent_ack(call));
    }

    let count = responses.len();
    upstream
        .send_tool_responses(responses)
        .await
        .context("Failed to send tool responses")?;
    info!(count, "Sent tool responses");
    Ok(())
}
