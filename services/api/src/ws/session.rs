//! Manages the primary WebSocket connection lifecycle for a relayed voice session.

use super::{
    protocol::ServerMessage,
    relay::RelaySession,
    transport::{ClientSink, WebSocketSink},
};
use crate::state::AppState;
use axum::{
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{Stream, StreamExt};
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, error, info, instrument, warn};

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

/// Main handler for an individual WebSocket connection.
///
/// Every connection gets its own [`RelaySession`] and therefore its own
/// upstream Gemini session.
#[instrument(name = "ws_session", skip_all, fields(session_id, %addr))]
async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: Arc<AppState>) {
    let session_id: u32 = rand::random();
    tracing::Span::current().record("session_id", session_id);
    info!("WebSocket connection established");

    let (socket_tx, socket_rx) = socket.split();
    let client: Arc<dyn ClientSink> = Arc::new(WebSocketSink::new(socket_tx));
    let session = Arc::new(RelaySession::new(
        session_id,
        state.connector.clone(),
        state.relay_settings(),
        client.clone(),
    ));

    run_connection(session, client, socket_rx).await;
    info!("WebSocket connection closed");
}

/// Drives one connection from connect to teardown.
///
/// The outbound relay runs on a spawned task while the inbound relay runs
/// here. However either one ends, the session is closed and the client
/// socket is shut.
pub(crate) async fn run_connection<S>(
    session: Arc<RelaySession>,
    client: Arc<dyn ClientSink>,
    incoming: S,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin + Send,
{
    let mut teardown = TeardownGuard {
        session: Some(session.clone()),
        client: client.clone(),
    };

    match session.connect().await {
        Ok(()) => {
            session.spawn_outbound().await;
            let exit = session.run_inbound(incoming).await;
            info!(?exit, session_id = session.id(), "Inbound relay finished");
            session.stop_outbound().await;
        }
        Err(e) => {
            error!(error = ?e, "Error connecting to Gemini");
            let message = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Err(send_err) = client.send(message).await {
                debug!(error = ?send_err, "Could not report error to client");
            }
        }
    }

    teardown.disarm();
    session.close().await;
    client.close().await;
}

/// Closes the session from a fresh task if `run_connection` unwinds or is
/// dropped before reaching its own teardown.
struct TeardownGuard {
    session: Option<Arc<RelaySession>>,
    client: Arc<dyn ClientSink>,
}

impl TeardownGuard {
    fn disarm(&mut self) {
        self.session = None;
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let client = self.client.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("Connection ended abruptly, closing session in the background");
                handle.spawn(async move {
                    session.close().await;
                    client.close().await;
                });
            }
            Err(_) => error!("No runtime available, session left open"),
        }
    }
}
