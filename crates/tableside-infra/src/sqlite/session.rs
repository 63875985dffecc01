//! SQLite session repository.
//!
//! Implements `SessionRepository` from `tableside-core`: raw queries, private
//! row structs, reads on the reader pool and writes on the writer pool.

use chrono::{DateTime, Utc};
use sqlx::Row;
use tableside_core::repository::session::SessionRepository;
use tableside_types::chat::{ChatMessage, ChatRole};
use tableside_types::error::RepositoryError;
use tableside_types::game::GameState;
use tableside_types::session::SessionSummary;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Private row types
// ---------------------------------------------------------------------------

struct ChatMessageRow {
    id: String,
    user: String,
    role: String,
    content: String,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user: row.try_get("user")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let role: ChatRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(ChatMessage {
            id: self.id,
            content: self.content,
            user: self.user,
            role,
        })
    }
}

struct SessionSummaryRow {
    session_id: String,
    message_count: i64,
    hand_count: i64,
    revision: i64,
    updated_at: Option<String>,
}

impl SessionSummaryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            session_id: row.try_get("session_id")?,
            message_count: row.try_get("message_count")?,
            hand_count: row.try_get("hand_count")?,
            revision: row.try_get("revision")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_summary(self) -> Result<SessionSummary, RepositoryError> {
        let updated_at = self.updated_at.as_deref().map(parse_datetime).transpose()?;

        Ok(SessionSummary {
            session_id: self.session_id,
            message_count: self.message_count,
            hand_count: self.hand_count,
            revision: self.revision,
            updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => RepositoryError::Connection,
        other => RepositoryError::Query(other.to_string()),
    }
}

const LIST_SESSIONS: &str = r#"
SELECT s.session_id AS session_id,
       (SELECT COUNT(*) FROM chat_messages m WHERE m.session_id = s.session_id) AS message_count,
       COALESCE((SELECT json_array_length(g.state, '$.handsState')
                   FROM game_states g WHERE g.session_id = s.session_id), 0) AS hand_count,
       COALESCE((SELECT g.revision FROM game_states g WHERE g.session_id = s.session_id), 0) AS revision,
       NULLIF(MAX(
           COALESCE((SELECT MAX(m.updated_at) FROM chat_messages m WHERE m.session_id = s.session_id), ''),
           COALESCE((SELECT g.updated_at FROM game_states g WHERE g.session_id = s.session_id), '')
       ), '') AS updated_at
FROM (SELECT session_id FROM chat_messages UNION SELECT session_id FROM game_states) s
ORDER BY s.session_id
"#;

// ---------------------------------------------------------------------------
// SessionRepository implementation
// ---------------------------------------------------------------------------

impl SessionRepository for SqliteSessionRepository {
    async fn load_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT id, "user", role, content FROM chat_messages
               WHERE session_id = ? ORDER BY seq ASC"#,
        )
        .bind(session_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row =
                ChatMessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(msg_row.into_message()?);
        }

        Ok(messages)
    }

    async fn upsert_message(
        &self,
        session_id: &str,
        message: &ChatMessage,
    ) -> Result<(), RepositoryError> {
        let now = now();
        // On conflict only the content changes; `seq` keeps the slot and the
        // first write owns `user` and `role`.
        sqlx::query(
            r#"INSERT INTO chat_messages (session_id, id, "user", role, content, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(session_id, id) DO UPDATE SET
                   content = excluded.content,
                   updated_at = excluded.updated_at"#,
        )
        .bind(session_id)
        .bind(&message.id)
        .bind(&message.user)
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn load_game_state(&self, session_id: &str) -> Result<Option<GameState>, RepositoryError> {
        let row = sqlx::query("SELECT state FROM game_states WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let text: String = row
            .try_get("state")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let state = serde_json::from_str(&text)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        Ok(Some(state))
    }

    async fn save_game_state(
        &self,
        session_id: &str,
        state: &GameState,
    ) -> Result<(), RepositoryError> {
        let text =
            serde_json::to_string(state).map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO game_states (session_id, state, revision, updated_at)
               VALUES (?, ?, 1, ?)
               ON CONFLICT(session_id) DO UPDATE SET
                   state = excluded.state,
                   revision = game_states.revision + 1,
                   updated_at = excluded.updated_at"#,
        )
        .bind(session_id)
        .bind(text)
        .bind(now())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, RepositoryError> {
        let rows = sqlx::query(LIST_SESSIONS)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let summary_row = SessionSummaryRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            sessions.push(summary_row.into_summary()?);
        }

        Ok(sessions)
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        let messages = sqlx::query("DELETE FROM chat_messages WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;
        let state = sqlx::query("DELETE FROM game_states WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;

        Ok(messages.rows_affected() + state.rows_affected() > 0)
    }
}
