//! Session command handlers.

use anyhow::{Context, Result};
use chrono::Utc;
use parley_core::api::ChatBackend;
use parley_core::session::Message;

const UNTITLED: &str = "Untitled";

pub async fn list(backend: &dyn ChatBackend) -> Result<()> {
    let sessions = backend.list_sessions().await.context("list sessions")?;
    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    let now = Utc::now();
    for session in sessions {
        let title = if session.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            session.display_title()
        };
        println!(
            "{}  {}  {}",
            title,
            session.id,
            session.display_timestamp(now)
        );
    }
    Ok(())
}

pub async fn show(backend: &dyn ChatBackend, id: &str) -> Result<()> {
    let history = backend
        .load_session(id)
        .await
        .with_context(|| format!("load session '{id}'"))?;
    if history.messages.is_empty() {
        println!("Session '{id}' is empty.");
    } else {
        println!("{}", format_transcript(&history.messages));
    }
    Ok(())
}

pub async fn delete(backend: &dyn ChatBackend, id: &str) -> Result<()> {
    backend
        .delete_session(id)
        .await
        .with_context(|| format!("delete session '{id}'"))?;
    println!("Deleted session {id}");
    Ok(())
}

fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| format!("{}: {}", message.role.label(), message.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
