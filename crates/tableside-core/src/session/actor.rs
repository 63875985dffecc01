//! The per-session actor.
//!
//! One actor owns everything mutable about a session: the game state, the
//! chat log, and the connection registry. Commands arrive on a single mpsc
//! queue and are handled one at a time, so no two mutations of the same
//! session ever interleave. Different sessions run as independent tasks.
//!
//! Every mutating operation writes to the repository before anything is
//! broadcast. If the write fails the in-memory state is left untouched and
//! nothing is sent, so clients never observe state the store has not
//! accepted.

use std::sync::Arc;

use tableside_types::chat::ChatMessage;
use tableside_types::config::HandDelivery;
use tableside_types::connection::ConnectionId;
use tableside_types::error::{RepositoryError, SessionError};
use tableside_types::game::{empty_object, GameState, HandState};
use tableside_types::protocol::{ClientFrame, Message};
use tableside_types::session::SessionSnapshot;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::chat_log::ChatLog;
use super::registry::{ConnectionRegistry, Frame, Outbound};
use crate::repository::session::SessionRepository;

/// Everything a session actor can be asked to do.
pub enum SessionCommand {
    /// A socket was accepted; hydrate it and start delivering to it.
    Connect {
        conn_id: ConnectionId,
        outbound: Outbound,
    },
    /// A text frame arrived on a socket.
    Inbound { conn_id: ConnectionId, raw: String },
    /// A socket closed.
    Disconnect { conn_id: ConnectionId },
    /// Report current state without changing it.
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// Administrative teardown: close every connection and stop, optionally
    /// deleting the session's stored log and state on the way out.
    Shutdown {
        purge: bool,
        done: oneshot::Sender<Result<bool, SessionError>>,
    },
}

/// Single point of mutation for one session.
pub struct SessionActor<R> {
    session_id: String,
    repo: Arc<R>,
    delivery: HandDelivery,
    game_state: GameState,
    chat_log: ChatLog,
    registry: ConnectionRegistry,
}

impl<R: SessionRepository> SessionActor<R> {
    /// Load the chat log and game state for `session_id`.
    ///
    /// A session that never stored a game state starts from the empty state.
    /// Safe to call any number of times; it only reads.
    pub async fn activate(
        session_id: impl Into<String>,
        repo: Arc<R>,
        delivery: HandDelivery,
    ) -> Result<Self, SessionError> {
        let session_id = session_id.into();
        let activation_error = |source: RepositoryError| SessionError::Activation {
            session_id: session_id.clone(),
            source,
        };

        let messages = repo
            .load_messages(&session_id)
            .await
            .map_err(activation_error)?;
        let game_state = repo
            .load_game_state(&session_id)
            .await
            .map_err(activation_error)?
            .unwrap_or_default();

        info!(
            %session_id,
            messages = messages.len(),
            hands = game_state.hands().len(),
            "session activated"
        );

        Ok(Self {
            session_id,
            repo,
            delivery,
            game_state,
            chat_log: ChatLog::from_messages(messages),
            registry: ConnectionRegistry::new(),
        })
    }

    /// Process commands until the queue closes or a shutdown arrives.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                SessionCommand::Connect { conn_id, outbound } => self.on_connect(conn_id, outbound),
                SessionCommand::Inbound { conn_id, raw } => self.on_message(conn_id, &raw).await,
                SessionCommand::Disconnect { conn_id } => self.on_disconnect(conn_id),
                SessionCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                SessionCommand::Shutdown { purge, done } => {
                    info!(
                        session_id = %self.session_id,
                        connections = self.registry.len(),
                        purge,
                        "session shutting down"
                    );
                    self.registry.clear();
                    let result = if purge {
                        self.repo
                            .delete_session(&self.session_id)
                            .await
                            .map_err(SessionError::from)
                    } else {
                        Ok(false)
                    };
                    let _ = done.send(result);
                    return;
                }
            }
        }
        debug!(session_id = %self.session_id, "session command queue closed");
    }

    /// Hydrate a new connection, then start including it in deliveries.
    ///
    /// The hydrate frame is queued before the connection joins the registry,
    /// so it is always the first thing the connection receives.
    pub fn on_connect(&mut self, conn_id: ConnectionId, outbound: Outbound) {
        let hydrate = Message::Hydrate {
            messages: self.chat_log.messages().to_vec(),
            game_state: self.game_state.clone(),
        };
        if let Some(frame) = encode(&hydrate) {
            let _ = outbound.send(frame);
        }
        self.registry.attach(conn_id, outbound);
        debug!(
            session_id = %self.session_id,
            %conn_id,
            connections = self.registry.len(),
            "connection attached"
        );
    }

    /// Decode and dispatch one inbound frame.
    ///
    /// Malformed frames are logged and dropped; the session keeps running.
    pub async fn on_message(&mut self, conn_id: ConnectionId, raw: &str) {
        let frame = match ClientFrame::parse(raw) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(
                    session_id = %self.session_id,
                    %conn_id,
                    error = %err,
                    "dropping malformed frame"
                );
                return;
            }
        };

        match frame {
            ClientFrame::HandJoined {
                session_id,
                sender_id,
            } => {
                if session_id.as_deref().is_some_and(|id| id != self.session_id) {
                    debug!(
                        session_id = %self.session_id,
                        announced = ?session_id,
                        "hand-joined names a different session"
                    );
                }
                self.hand_joined(conn_id, sender_id, raw).await;
            }
            ClientFrame::UpdateState { state } => self.update_state(state, raw).await,
            ClientFrame::Chat { kind, message } => {
                debug!(session_id = %self.session_id, ?kind, id = %message.id, "chat upsert");
                self.upsert_chat(conn_id, message, raw).await;
            }
            ClientFrame::ReconnectPing => {
                let reached = self.registry.broadcast(&Frame::from(raw), Some(conn_id));
                info!(session_id = %self.session_id, reached, "relayed reconnect-ping");
            }
            ClientFrame::Relay { tag } => {
                let reached = self.registry.broadcast(&Frame::from(raw), Some(conn_id));
                debug!(session_id = %self.session_id, %tag, reached, "relayed frame");
            }
        }
    }

    /// Release a connection; announce its identity if it had one.
    pub fn on_disconnect(&mut self, conn_id: ConnectionId) {
        let was_known = self.registry.contains(conn_id);
        match self.registry.detach(conn_id) {
            Some(sender_id) => {
                info!(session_id = %self.session_id, %conn_id, %sender_id, "hand disconnected");
                if let Some(frame) = encode(&Message::HandDisconnected { sender_id }) {
                    self.registry.broadcast(&frame, None);
                }
            }
            None if was_known => {
                debug!(session_id = %self.session_id, %conn_id, "anonymous connection closed");
            }
            None => return,
        }

        if self.registry.is_empty() {
            info!(session_id = %self.session_id, "session idle");
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            live: true,
            connections: self.registry.len(),
            identified: self.registry.identities(),
            game_state: self.game_state.clone(),
            messages: self.chat_log.messages().to_vec(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.chat_log.messages()
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    async fn hand_joined(&mut self, conn_id: ConnectionId, sender_id: String, raw: &str) {
        if !self.game_state.has_hand(&sender_id) {
            let mut next = self.game_state.clone();
            next.push_hand(HandState::empty(sender_id.clone()));
            if let Err(err) = self.repo.save_game_state(&self.session_id, &next).await {
                error!(
                    session_id = %self.session_id,
                    %sender_id,
                    error = %err,
                    "failed to persist new hand, ignoring hand-joined"
                );
                return;
            }
            self.game_state = next;
            info!(session_id = %self.session_id, %sender_id, "hand added");
        }

        match self.registry.bind(conn_id, sender_id.clone()) {
            Some(previous) if previous != sender_id => {
                debug!(session_id = %self.session_id, %conn_id, %previous, %sender_id, "connection re-bound");
            }
            _ => {}
        }

        let state = self
            .game_state
            .hand(&sender_id)
            .map(|hand| hand.state().to_owned())
            .unwrap_or_else(empty_object);
        if let Some(frame) = encode(&Message::YourState {
            hand_id: sender_id,
            state,
        }) {
            self.registry.send_to(conn_id, &frame);
        }

        self.registry.broadcast(&Frame::from(raw), Some(conn_id));
    }

    /// Replace the whole state. When the incoming state needed no changes the
    /// client's frame is relayed as received.
    async fn update_state(&mut self, state: GameState, raw: &str) {
        let state = state.normalized();
        if let Err(err) = self.repo.save_game_state(&self.session_id, &state).await {
            error!(
                session_id = %self.session_id,
                error = %err,
                "failed to persist game state, update dropped"
            );
            return;
        }
        self.game_state = state;
        debug!(
            session_id = %self.session_id,
            hands = self.game_state.hands().len(),
            "game state saved"
        );

        let frame = if self.game_state.is_verbatim() {
            Some(Frame::from(raw))
        } else {
            encode(&Message::UpdateState {
                state: self.game_state.clone(),
            })
        };
        if let Some(frame) = frame {
            self.registry.broadcast(&frame, None);
        }

        for hand in self.game_state.hands() {
            let Some(hand_id) = hand.hand_id() else {
                continue;
            };
            let Some(frame) = encode(&Message::YourState {
                hand_id: hand_id.to_owned(),
                state: hand.state().to_owned(),
            }) else {
                continue;
            };
            match self.delivery {
                HandDelivery::Broadcast => {
                    self.registry.broadcast(&frame, None);
                }
                HandDelivery::Unicast => {
                    if self.registry.send_to_sender(hand_id, &frame) == 0 {
                        debug!(
                            session_id = %self.session_id,
                            %hand_id,
                            "no live connection for hand"
                        );
                    }
                }
            }
        }
    }

    async fn upsert_chat(&mut self, conn_id: ConnectionId, message: ChatMessage, raw: &str) {
        if let Err(err) = self.repo.upsert_message(&self.session_id, &message).await {
            error!(
                session_id = %self.session_id,
                id = %message.id,
                error = %err,
                "failed to persist chat message, dropped"
            );
            return;
        }
        self.chat_log.upsert(message);
        self.registry.broadcast(&Frame::from(raw), Some(conn_id));
    }
}

fn encode(message: &Message) -> Option<Frame> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Frame::from(json)),
        Err(err) => {
            warn!(tag = message.tag(), error = %err, "failed to serialize message");
            None
        }
    }
}
