//! Session repository trait definition.
//!
//! Defines the storage interface for a session's two durable artifacts:
//! the chat/event log (upsert by id, read in insertion order) and the single
//! game-state record (read, overwrite in full). The infrastructure layer
//! (tableside-infra) implements this trait with SQLite persistence.

use tableside_types::chat::ChatMessage;
use tableside_types::error::RepositoryError;
use tableside_types::game::GameState;
use tableside_types::session::SessionSummary;

/// Repository trait for per-session persistence.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait SessionRepository: Send + Sync {
    // -----------------------------------------------------------------------
    // Chat log
    // -----------------------------------------------------------------------

    /// Full chat log for a session, in original insertion order.
    fn load_messages(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Insert a message, or replace the stored message with the same id.
    ///
    /// A replaced message keeps its original position in the log.
    fn upsert_message(
        &self,
        session_id: &str,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Game state
    // -----------------------------------------------------------------------

    /// The stored game state, or `None` if the session never wrote one.
    fn load_game_state(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<GameState>, RepositoryError>> + Send;

    /// Overwrite the stored game state in full.
    fn save_game_state(
        &self,
        session_id: &str,
        state: &GameState,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Every session with a stored log or state, ordered by id.
    fn list_sessions(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<SessionSummary>, RepositoryError>> + Send;

    /// Remove a session's log and state. Returns `true` if anything was stored.
    fn delete_session(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
