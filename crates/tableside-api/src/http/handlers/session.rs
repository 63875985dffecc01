//! Session admin HTTP handlers.
//!
//! Endpoints:
//! - GET    /api/v1/sessions      - List persisted and live sessions
//! - GET    /api/v1/sessions/{id} - Snapshot of one session
//! - DELETE /api/v1/sessions/{id} - Tear down and purge a session

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use tableside_core::repository::session::SessionRepository;
use tableside_types::session::{SessionSnapshot, SessionSummary};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// One row of the session listing: the stored summary plus live status.
#[derive(Debug, Serialize)]
pub struct SessionListing {
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub live: bool,
    pub connections: usize,
}

/// Result of a teardown request.
#[derive(Debug, Serialize)]
pub struct TeardownResult {
    pub session_id: String,
    pub purged: bool,
}

/// Reject ids no client could have connected with.
pub fn validate_session_id(session_id: &str) -> Result<(), AppError> {
    if session_id.trim().is_empty() {
        return Err(AppError::Validation("session id must not be blank".to_string()));
    }
    Ok(())
}

/// GET /api/v1/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SessionListing>>>, AppError> {
    let timer = RequestTimer::start();

    let mut rows: BTreeMap<String, SessionListing> = state
        .hub
        .repository()
        .list_sessions()
        .await?
        .into_iter()
        .map(|summary| {
            let listing = SessionListing {
                summary,
                live: false,
                connections: 0,
            };
            (listing.summary.session_id.clone(), listing)
        })
        .collect();

    // Sessions with connections but nothing written yet are listed too.
    for session_id in state.hub.live_sessions() {
        let Some(handle) = state.hub.live(&session_id) else {
            continue;
        };
        let Ok(snapshot) = handle.snapshot().await else {
            continue;
        };
        let row = rows.entry(session_id.clone()).or_insert_with(|| SessionListing {
            summary: SessionSummary {
                session_id,
                message_count: snapshot.messages.len() as i64,
                hand_count: snapshot.game_state.hands().len() as i64,
                revision: 0,
                updated_at: None,
            },
            live: false,
            connections: 0,
        });
        row.live = true;
        row.connections = snapshot.connections;
    }

    let resp = timer
        .finish(rows.into_values().collect())
        .with_link("self", "/api/v1/sessions");
    Ok(Json(resp))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<SessionSnapshot>>, AppError> {
    let timer = RequestTimer::start();
    validate_session_id(&session_id)?;

    let snapshot = state
        .hub
        .snapshot(&session_id)
        .await?
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    let resp = timer
        .finish(snapshot)
        .with_link("self", &format!("/api/v1/sessions/{session_id}"))
        .with_link("socket", &format!("/parties/chat/{session_id}"));
    Ok(Json(resp))
}

/// DELETE /api/v1/sessions/{id}
///
/// Closes every connection of the session and deletes its stored log and state.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<TeardownResult>>, AppError> {
    let timer = RequestTimer::start();
    validate_session_id(&session_id)?;

    if !state.hub.teardown(&session_id, true).await? {
        return Err(AppError::SessionNotFound(session_id));
    }
    tracing::info!(%session_id, "session purged via API");

    let resp = timer.finish(TeardownResult {
        session_id,
        purged: true,
    });
    Ok(Json(resp))
}
