//! Session management CLI commands: list, show, purge.
//!
//! These read the store directly. A purge here removes stored data only;
//! a running server keeps its in-memory copy until the session is torn down
//! through `DELETE /api/v1/sessions/{id}`.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use tableside_core::repository::session::SessionRepository;
use tableside_types::chat::ChatRole;

use crate::state::AppState;

/// List stored sessions with counts and last update.
///
/// # Examples
///
/// ```bash
/// tableside sessions list
/// tableside sessions list --json
/// ```
pub async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    let sessions = state.hub.repository().list_sessions().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No stored sessions. Start one with: {}",
            style("i").blue().bold(),
            style("tableside serve").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Session").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Hands").fg(Color::White),
        Cell::new("Revision").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for session in &sessions {
        let updated = session
            .updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(&session.session_id).fg(Color::Cyan),
            Cell::new(session.message_count.to_string()).fg(Color::White),
            Cell::new(session.hand_count.to_string()).fg(Color::White),
            Cell::new(session.revision.to_string()).fg(Color::DarkGrey),
            Cell::new(updated).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Print a session's hands, shared state and chat log.
pub async fn show_session(state: &AppState, session_id: &str, json: bool) -> Result<()> {
    let snapshot = state
        .hub
        .snapshot(session_id)
        .await?
        .with_context(|| format!("Session '{session_id}' not found"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!();
    println!("  Session '{}'", style(&snapshot.session_id).cyan().bold());
    println!();
    println!("  {} {}", style("Shared state:").bold(), snapshot.game_state.server_state().get());
    println!();

    if snapshot.game_state.hands().is_empty() {
        println!("  {}", style("No hands have joined.").dim());
    } else {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Hand").fg(Color::White),
            Cell::new("State").fg(Color::White),
        ]);
        for hand in snapshot.game_state.hands() {
            table.add_row(vec![
                Cell::new(hand.hand_id().unwrap_or("-")).fg(Color::Cyan),
                Cell::new(hand.state().get()).fg(Color::White),
            ]);
        }
        println!("{table}");
    }
    println!();

    if snapshot.messages.is_empty() {
        println!("  {}", style("No chat messages.").dim());
    } else {
        for msg in &snapshot.messages {
            let who = match msg.role {
                ChatRole::User => style(&msg.user).green().bold(),
                ChatRole::Assistant => style(&msg.user).magenta().bold(),
            };
            println!("  {who}: {}", msg.content);
        }
    }
    println!();

    Ok(())
}

/// Delete a session's stored data, with confirmation unless `force`.
pub async fn purge_session(state: &AppState, session_id: &str, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete the chat log and game state of '{}'?",
                style(session_id).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let purged = state.hub.teardown(session_id, true).await?;

    if json {
        let result = serde_json::json!({
            "session_id": session_id,
            "purged": purged,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if purged {
        println!(
            "  {} Session '{}' purged.",
            style("✓").green().bold(),
            style(session_id).cyan()
        );
    } else {
        println!(
            "  {} Nothing stored for '{}'.",
            style("i").blue().bold(),
            style(session_id).cyan()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableside_types::chat::ChatMessage;
    use tableside_types::game::GameState;

    async fn test_state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        AppState::init_at(path).await.unwrap()
    }

    #[tokio::test]
    async fn test_purge_force_removes_stored_data() {
        let state = test_state().await;
        let repo = state.hub.repository();
        repo.upsert_message(
            "s1",
            &ChatMessage {
                id: "m1".to_string(),
                content: "hi".to_string(),
                user: "ann".to_string(),
                role: ChatRole::User,
            },
        )
        .await
        .unwrap();
        repo.save_game_state("s1", &GameState::default()).await.unwrap();

        show_session(&state, "s1", true).await.unwrap();
        purge_session(&state, "s1", true, true).await.unwrap();

        assert!(repo.list_sessions().await.unwrap().is_empty());
        assert!(show_session(&state, "s1", true).await.is_err());
    }

    #[tokio::test]
    async fn test_list_empty_store() {
        let state = test_state().await;
        list_sessions(&state, true).await.unwrap();
        list_sessions(&state, false).await.unwrap();
    }
}
