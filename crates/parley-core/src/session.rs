//! Conversation data model.
//!
//! - `SessionSummary`: one row of the directory listing
//! - `Message`: one entry of a conversation transcript
//! - `SessionHistory`: a full conversation as returned by the backend
//! - `PredictReply`: the backend's answer to a sent message

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Assistant text shown when a send fails for any reason other than cancellation.
pub const FAILED_REPLY_TEXT: &str = "Error: Could not reach server";

/// Assistant text used when the backend answers with an empty prediction.
pub const EMPTY_REPLY_TEXT: &str = "No response";

/// Title shown for a conversation that has not been named yet.
pub const DEFAULT_TITLE: &str = "ChatBot";

/// Max title width in the directory listing.
pub const SUMMARY_TITLE_MAX_CHARS: usize = 30;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Returns the transcript label for this role.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Snapshot of a stored session, as listed by the backend.
///
/// Never edited in place: a refresh replaces the whole list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub preview: String,
}

impl SessionSummary {
    /// Returns the title shortened for the directory listing.
    pub fn display_title(&self) -> String {
        truncate_chars(&self.title, SUMMARY_TITLE_MAX_CHARS)
    }

    /// Returns the last-updated time relative to `now`.
    pub fn display_timestamp(&self, now: DateTime<Utc>) -> String {
        format_relative_timestamp(self.updated_at, now)
    }
}

/// A single transcript entry.
///
/// Locally created messages get a fresh UUID; messages loaded from the
/// backend keep the server id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub failed: bool,
}

impl Message {
    /// Creates a user message stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self::local(Role::User, content.into(), false)
    }

    /// Creates an assistant message from a prediction.
    ///
    /// Empty predictions become [`EMPTY_REPLY_TEXT`].
    pub fn assistant(content: impl Into<String>) -> Self {
        let content = content.into();
        let content = if content.is_empty() {
            EMPTY_REPLY_TEXT.to_string()
        } else {
            content
        };
        Self::local(Role::Assistant, content, false)
    }

    /// Creates the synthetic assistant message appended after a failed send.
    pub fn failure() -> Self {
        Self::local(Role::Assistant, FAILED_REPLY_TEXT.to_string(), true)
    }

    fn local(role: Role, content: String, failed: bool) -> Self {
        Self {
            id: new_message_id(),
            content,
            role,
            created_at: Utc::now(),
            failed,
        }
    }
}

/// Generates a unique local message id.
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Full history of a stored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHistory {
    pub title: String,
    pub messages: Vec<Message>,
}

/// Backend answer to a predict request.
///
/// `session_id` and `chat_title` identify the session the message was stored
/// in; callers only adopt them for conversations without an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictReply {
    pub prediction: String,
    pub session_id: Option<String>,
    pub chat_title: Option<String>,
}

/// Outgoing message for the predict endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictRequest {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Truncates to `max_chars` characters, appending `...` when shortened.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

/// Formats a timestamp relative to `now`.
///
/// Under an hour: `Just now`. Under a day: `Nh ago`. Otherwise the local date.
pub fn format_relative_timestamp(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    let hours = elapsed.num_hours();
    if elapsed.num_minutes() < 60 {
        "Just now".to_string()
    } else if hours < 24 {
        format!("{hours}h ago")
    } else {
        timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d")
            .to_string()
    }
}

/// Returns the footer label for a directory of `count` sessions.
pub fn chat_count_label(count: usize) -> String {
    if count == 1 {
        "1 chat".to_string()
    } else {
        format!("{count} chats")
    }
}
