//! JSON shapes of the backend HTTP contract.
//!
//! Wire types stay private to the api module; callers only see the domain
//! types from `crate::session`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::session::{Message, PredictReply, Role, SessionHistory, SessionSummary};

#[derive(Debug, Deserialize)]
pub(crate) struct SessionListResponse {
    pub sessions: Vec<WireSession>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSession {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(deserialize_with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, rename = "lastMessage")]
    pub last_message: String,
}

impl From<WireSession> for SessionSummary {
    fn from(wire: WireSession) -> Self {
        SessionSummary {
            id: wire.id,
            title: wire.title,
            updated_at: wire.timestamp,
            preview: wire.last_message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionHistoryResponse {
    pub messages: Vec<WireMessage>,
    #[serde(default)]
    pub session_title: String,
}

impl From<SessionHistoryResponse> for SessionHistory {
    fn from(wire: SessionHistoryResponse) -> Self {
        SessionHistory {
            title: wire.session_title,
            messages: wire.messages.into_iter().map(Message::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub role: Role,
    #[serde(deserialize_with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Message {
            id: wire.id,
            content: wire.content,
            role: wire.role,
            created_at: wire.timestamp,
            failed: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PredictResponse {
    #[serde(default)]
    pub prediction: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chat_title: Option<String>,
}

impl From<PredictResponse> for PredictReply {
    fn from(wire: PredictResponse) -> Self {
        PredictReply {
            prediction: wire.prediction.unwrap_or_default(),
            session_id: wire.session_id.filter(|id| !id.is_empty()),
            chat_title: wire.chat_title,
        }
    }
}

/// Parses an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (with offset) and naive date-times, which are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let parsed = parse_timestamp("2024-05-01T10:30:00.123456+02:00").unwrap();
        assert_eq!(
            parsed.timestamp(),
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap().timestamp()
        );
    }

    #[test]
    fn test_parse_timestamp_naive_is_utc() {
        let parsed = parse_timestamp("2024-05-01T10:30:00.5").unwrap();
        assert_eq!(
            parsed.timestamp(),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap().timestamp()
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_session_list_decodes_into_summaries() {
        let body = r#"{"sessions": [
            {"id": "a1", "title": "Greeting", "timestamp": "2024-01-01T00:00:00Z", "lastMessage": "hello"},
            {"id": "b2", "title": "Other", "timestamp": "2024-01-02T00:00:00+00:00"}
        ]}"#;
        let list: SessionListResponse = serde_json::from_str(body).unwrap();
        let summaries: Vec<SessionSummary> =
            list.sessions.into_iter().map(SessionSummary::from).collect();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "a1");
        assert_eq!(summaries[0].preview, "hello");
        assert_eq!(summaries[1].preview, "");
    }

    #[test]
    fn test_history_decodes_roles_and_numeric_ids() {
        let body = r#"{
            "messages": [
                {"id": "7_user", "content": "hi", "role": "user", "timestamp": "2024-01-01T00:00:00"},
                {"id": 8, "content": "hello", "role": "assistant", "timestamp": "2024-01-01T00:00:01"}
            ],
            "session_title": "Greeting"
        }"#;
        let history: SessionHistory = serde_json::from_str::<SessionHistoryResponse>(body)
            .unwrap()
            .into();
        assert_eq!(history.title, "Greeting");
        assert_eq!(history.messages[0].role, Role::User);
        assert_eq!(history.messages[1].id, "8");
        assert!(history.messages.iter().all(|m| !m.failed));
    }

    #[test]
    fn test_predict_response_optional_identity() {
        let reply: PredictReply = serde_json::from_str::<PredictResponse>(r#"{"prediction": "hi"}"#)
            .unwrap()
            .into();
        assert_eq!(reply.prediction, "hi");
        assert_eq!(reply.session_id, None);
        assert_eq!(reply.chat_title, None);
    }
}
