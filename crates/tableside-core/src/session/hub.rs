//! Lazy per-key activation of session actors.
//!
//! The hub maps a session id to the command queue of its running actor. The
//! first access for an id spawns the actor, which loads its log and state
//! from the repository before draining any queued commands, so callers
//! never wait on activation. An actor whose task has ended (failed
//! activation, teardown) is replaced on the next access.
//!
//! Sessions are only ever stopped by [`SessionHub::teardown`]; a session
//! with no connections stays resident and keeps its state.

use std::sync::Arc;

use dashmap::DashMap;
use tableside_types::config::HandDelivery;
use tableside_types::connection::ConnectionId;
use tableside_types::error::SessionError;
use tableside_types::session::SessionSnapshot;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use super::actor::{SessionActor, SessionCommand};
use super::chat_log::ChatLog;
use super::registry::Outbound;
use crate::repository::session::SessionRepository;

/// Cheap, cloneable address of one running session actor.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Arc<str>,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Register a connection. Its first outbound frame will be `hydrate`.
    pub fn connect(&self, conn_id: ConnectionId, outbound: Outbound) -> Result<(), SessionError> {
        self.dispatch(SessionCommand::Connect { conn_id, outbound })
    }

    /// Hand an inbound text frame to the actor.
    pub fn send(&self, conn_id: ConnectionId, raw: String) -> Result<(), SessionError> {
        self.dispatch(SessionCommand::Inbound { conn_id, raw })
    }

    pub fn disconnect(&self, conn_id: ConnectionId) -> Result<(), SessionError> {
        self.dispatch(SessionCommand::Disconnect { conn_id })
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.dispatch(SessionCommand::Snapshot { reply })?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Stop the actor after it finishes the commands queued ahead of this one.
    ///
    /// Returns whether stored data was deleted (always `false` without `purge`).
    pub async fn shutdown(&self, purge: bool) -> Result<bool, SessionError> {
        let (done, rx) = oneshot::channel();
        self.dispatch(SessionCommand::Shutdown { purge, done })?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Whether the actor behind this handle has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Resolves once the actor behind this handle has stopped.
    pub async fn closed(&self) {
        self.commands.closed().await;
    }

    fn dispatch(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> SessionError {
        SessionError::Unavailable(self.session_id.to_string())
    }
}

/// Registry of running session actors, keyed by session id.
pub struct SessionHub<R> {
    repo: Arc<R>,
    delivery: HandDelivery,
    sessions: DashMap<String, SessionHandle>,
}

impl<R: SessionRepository + 'static> SessionHub<R> {
    pub fn new(repo: Arc<R>, delivery: HandDelivery) -> Self {
        Self {
            repo,
            delivery,
            sessions: DashMap::new(),
        }
    }

    /// Handle for `session_id`, activating the session if it is not running.
    pub fn session(&self, session_id: &str) -> SessionHandle {
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| self.spawn(session_id));
        if entry.is_closed() {
            debug!(%session_id, "replacing stopped session actor");
            *entry = self.spawn(session_id);
        }
        entry.value().clone()
    }

    /// Handle for `session_id` only if its actor is currently running.
    pub fn live(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions
            .get(session_id)
            .filter(|handle| !handle.is_closed())
            .map(|handle| handle.value().clone())
    }

    /// Ids of all sessions with a running actor, sorted.
    pub fn live_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Current state of a session: from its actor when running, otherwise
    /// read from the store. `None` if the session has never stored anything.
    pub async fn snapshot(&self, session_id: &str) -> Result<Option<SessionSnapshot>, SessionError> {
        if let Some(handle) = self.live(session_id) {
            match handle.snapshot().await {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(SessionError::Unavailable(_)) => {}
                Err(err) => return Err(err),
            }
        }

        let messages = self.repo.load_messages(session_id).await?;
        let game_state = self.repo.load_game_state(session_id).await?;
        if messages.is_empty() && game_state.is_none() {
            return Ok(None);
        }

        Ok(Some(SessionSnapshot {
            session_id: session_id.to_string(),
            live: false,
            connections: 0,
            identified: Vec::new(),
            game_state: game_state.unwrap_or_default(),
            messages: ChatLog::from_messages(messages).messages().to_vec(),
        }))
    }

    /// Administrative teardown: stop the session's actor (closing all of its
    /// connections) and, with `purge`, delete its stored log and state.
    ///
    /// Returns `true` if there was a running actor or stored data to remove.
    pub async fn teardown(&self, session_id: &str, purge: bool) -> Result<bool, SessionError> {
        let Some(handle) = self.live(session_id) else {
            return if purge {
                Ok(self.repo.delete_session(session_id).await?)
            } else {
                Ok(false)
            };
        };

        // Purging happens inside the actor so no write of its own can land
        // after the delete.
        let result = handle.shutdown(purge).await;
        self.sessions
            .remove_if(session_id, |_, current| current.commands.same_channel(&handle.commands));
        info!(%session_id, purge, "session torn down");
        result.map(|_| true)
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    fn spawn(&self, session_id: &str) -> SessionHandle {
        let (commands, queue) = mpsc::unbounded_channel();
        let repo = Arc::clone(&self.repo);
        let delivery = self.delivery;
        let id = session_id.to_string();

        tokio::spawn(async move {
            match SessionActor::activate(id.clone(), repo, delivery).await {
                Ok(actor) => actor.run(queue).await,
                Err(err) => error!(session_id = %id, error = %err, "session activation failed"),
            }
        });

        SessionHandle {
            session_id: Arc::from(session_id),
            commands,
        }
    }
}
