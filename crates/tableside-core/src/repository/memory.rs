//! In-memory `SessionRepository` used by the core's own tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tableside_types::chat::ChatMessage;
use tableside_types::error::RepositoryError;
use tableside_types::game::GameState;
use tableside_types::session::SessionSummary;

use super::session::SessionRepository;

#[derive(Default)]
struct StoredSession {
    messages: Vec<ChatMessage>,
    state: Option<GameState>,
    revision: i64,
}

/// Map-backed repository with switchable write failures.
#[derive(Default)]
pub(crate) struct MemoryRepository {
    sessions: Mutex<BTreeMap<String, StoredSession>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    state_writes: AtomicUsize,
}

impl MemoryRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn state_writes(&self) -> usize {
        self.state_writes.load(Ordering::SeqCst)
    }

    pub(crate) fn stored_state(&self, session_id: &str) -> Option<GameState> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .and_then(|s| s.state.clone())
    }

    pub(crate) fn stored_messages(&self, session_id: &str) -> Vec<ChatMessage> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    fn check_write(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk I/O error".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        Ok(())
    }
}

impl SessionRepository for MemoryRepository {
    async fn load_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.check_read()?;
        Ok(self.stored_messages(session_id))
    }

    async fn upsert_message(
        &self,
        session_id: &str,
        message: &ChatMessage,
    ) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut sessions = self.sessions.lock().unwrap();
        let stored = sessions.entry(session_id.to_string()).or_default();
        match stored.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => existing.content = message.content.clone(),
            None => stored.messages.push(message.clone()),
        }
        Ok(())
    }

    async fn load_game_state(&self, session_id: &str) -> Result<Option<GameState>, RepositoryError> {
        self.check_read()?;
        Ok(self.stored_state(session_id))
    }

    async fn save_game_state(
        &self,
        session_id: &str,
        state: &GameState,
    ) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut sessions = self.sessions.lock().unwrap();
        let stored = sessions.entry(session_id.to_string()).or_default();
        stored.state = Some(state.clone());
        stored.revision += 1;
        self.state_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, RepositoryError> {
        self.check_read()?;
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .iter()
            .map(|(id, s)| SessionSummary {
                session_id: id.clone(),
                message_count: s.messages.len() as i64,
                hand_count: s.state.as_ref().map_or(0, |g| g.hands().len() as i64),
                revision: s.revision,
                updated_at: None,
            })
            .collect())
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool, RepositoryError> {
        self.check_write()?;
        Ok(self.sessions.lock().unwrap().remove(session_id).is_some())
    }
}
