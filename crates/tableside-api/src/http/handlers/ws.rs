//! WebSocket endpoint joining a client to a session.
//!
//! `/parties/chat/{session_id}` upgrades the connection, assigns it a fresh
//! `ConnectionId`, and registers it with the session's actor. The handler then:
//!
//! - **Forwards outbound frames:** everything the actor queues for this
//!   connection is written to the socket as a text frame.
//! - **Forwards inbound frames:** every text frame from the client goes to the
//!   actor unparsed; the actor owns decoding and dispatch.
//!
//! When either side ends (client close, socket error, or the actor closing
//! the outbound queue on teardown) the actor is told exactly once.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use tableside_core::session::{Frame, SessionHandle};
use tableside_types::connection::ConnectionId;

use crate::http::handlers::session::validate_session_id;
use crate::state::AppState;

/// Upgrade an HTTP request to a session WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    if let Err(err) = validate_session_id(&session_id) {
        return err.into_response();
    }
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, session_id))
}

/// Register with the session actor, retrying once if the actor stopped
/// between lookup and registration.
fn join_session(
    state: &AppState,
    session_id: &str,
    conn_id: ConnectionId,
    outbound: mpsc::UnboundedSender<Frame>,
) -> Option<SessionHandle> {
    let handle = state.hub.session(session_id);
    match handle.connect(conn_id, outbound.clone()) {
        Ok(()) => return Some(handle),
        Err(err) => tracing::debug!(%session_id, %conn_id, error = %err, "retrying session join"),
    }

    let handle = state.hub.session(session_id);
    match handle.connect(conn_id, outbound) {
        Ok(()) => Some(handle),
        Err(err) => {
            tracing::warn!(%session_id, %conn_id, error = %err, "could not join session");
            None
        }
    }
}

async fn handle_ws_connection(socket: WebSocket, state: AppState, session_id: String) {
    let conn_id = ConnectionId::new();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();

    let Some(handle) = join_session(&state, &session_id, conn_id, outbound_tx) else {
        return;
    };
    tracing::debug!(%session_id, %conn_id, "WebSocket connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                match frame {
                    Some(frame) => {
                        if ws_sender.send(Message::Text(frame.as_ref().into())).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        // Session torn down.
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        if handle.send(conn_id, text.as_str().to_owned()).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(%session_id, %conn_id, "WebSocket receive error: {err}");
                        break;
                    }
                    // Binary, ping and pong frames carry nothing for the session.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    if let Err(err) = handle.disconnect(conn_id) {
        tracing::debug!(%session_id, %conn_id, error = %err, "disconnect after session stopped");
    }
    tracing::debug!(%session_id, %conn_id, "WebSocket closed");
}
