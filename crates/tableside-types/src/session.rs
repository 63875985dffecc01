//! Read models describing a session for administrative views.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chat::ChatMessage;
use crate::game::GameState;

/// One persisted session as listed by the store.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub message_count: i64,
    pub hand_count: i64,
    /// Number of game-state writes so far (0 if never written).
    pub revision: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of a session's in-memory state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    /// Whether a live actor produced this snapshot (false when read from the store).
    pub live: bool,
    pub connections: usize,
    /// Hand ids currently bound to at least one live connection.
    pub identified: Vec<String>,
    pub game_state: GameState,
    pub messages: Vec<ChatMessage>,
}
