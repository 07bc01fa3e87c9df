//! Cached listing of stored sessions.

use std::collections::HashSet;
use std::mem;

use tokio_util::sync::CancellationToken;

use crate::api::ApiResult;
use crate::session::{SessionSummary, chat_count_label};
use crate::task::{TaskId, TaskSeq, TaskState};

pub const EMPTY_DIRECTORY_TEXT: &str = "No chat history yet";
pub const LOADING_DIRECTORY_TEXT: &str = "Loading chats...";

/// Notifications for whoever owns the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    SelectionRequested(String),
    NewChatRequested,
}

/// A list request to run against the backend.
#[derive(Debug, Clone)]
pub struct RefreshRequest {
    pub ticket: TaskId,
    pub token: CancellationToken,
}

/// A delete request to run against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveRequest {
    pub session_id: String,
}

/// Session summaries in server order, plus sidebar-local view state.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    sessions: Vec<SessionSummary>,
    collapsed: bool,
    refresh: TaskState,
    seq: TaskSeq,
    deleting: HashSet<String>,
    /// Ids deleted while a refresh was in flight; that snapshot may still list them.
    deleted_during_refresh: HashSet<String>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SessionSummary> {
        self.sessions.get(index)
    }

    pub fn position(&self, session_id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == session_id)
    }

    pub fn is_loading(&self) -> bool {
        self.refresh.is_running()
    }

    pub fn is_deleting(&self, session_id: &str) -> bool {
        self.deleting.contains(session_id)
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn toggle_collapsed(&mut self) {
        self.collapsed = !self.collapsed;
    }

    /// Text shown in place of an empty list.
    pub fn placeholder(&self) -> Option<&'static str> {
        if !self.sessions.is_empty() {
            None
        } else if self.is_loading() {
            Some(LOADING_DIRECTORY_TEXT)
        } else {
            Some(EMPTY_DIRECTORY_TEXT)
        }
    }

    /// Footer text, e.g. `3 chats`.
    pub fn footer(&self) -> String {
        chat_count_label(self.sessions.len())
    }

    /// Starts a list refresh. Older refreshes still in flight are superseded.
    pub fn refresh(&mut self) -> RefreshRequest {
        let ticket = self.seq.next_id();
        let token = self.refresh.start(ticket);
        tracing::debug!(ticket = ticket.0, "refreshing session list");
        RefreshRequest { ticket, token }
    }

    /// Applies a list response. Returns false when the ticket is stale.
    ///
    /// Success replaces the whole list; failure keeps the previous one.
    pub fn finish_refresh(
        &mut self,
        ticket: TaskId,
        result: ApiResult<Vec<SessionSummary>>,
    ) -> bool {
        if !self.refresh.finish_if_active(ticket) {
            tracing::debug!(ticket = ticket.0, "dropping stale session list");
            return false;
        }
        let deleted = mem::take(&mut self.deleted_during_refresh);
        match result {
            Ok(mut sessions) => {
                sessions.retain(|s| !deleted.contains(&s.id));
                tracing::debug!(count = sessions.len(), "session list updated");
                self.sessions = sessions;
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::warn!(error = %e, "failed to refresh session list"),
        }
        true
    }

    /// Requests that the conversation switch to `session_id`.
    pub fn select(&self, session_id: impl Into<String>) -> DirectoryEvent {
        DirectoryEvent::SelectionRequested(session_id.into())
    }

    pub fn new_chat(&self) -> DirectoryEvent {
        DirectoryEvent::NewChatRequested
    }

    /// Starts deleting `session_id`.
    ///
    /// Returns `None` if a delete for the same id is already in flight.
    pub fn remove(&mut self, session_id: impl Into<String>) -> Option<RemoveRequest> {
        let session_id = session_id.into();
        if !self.deleting.insert(session_id.clone()) {
            return None;
        }
        tracing::debug!(%session_id, "deleting session");
        Some(RemoveRequest { session_id })
    }

    /// Applies a delete response. Returns true when the entry was removed.
    pub fn finish_remove(&mut self, session_id: &str, result: ApiResult<()>) -> bool {
        self.deleting.remove(session_id);
        match result {
            Ok(()) => {
                if self.is_loading() {
                    self.deleted_during_refresh.insert(session_id.to_string());
                }
                let before = self.sessions.len();
                self.sessions.retain(|s| s.id != session_id);
                self.sessions.len() != before
            }
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "failed to delete session");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::api::ApiError;

    fn summary(id: &str, title: &str) -> SessionSummary {
        SessionSummary {
            id: id.to_string(),
            title: title.to_string(),
            updated_at: Utc::now(),
            preview: String::new(),
        }
    }

    fn loaded(ids: &[&str]) -> SessionDirectory {
        let mut directory = SessionDirectory::new();
        let request = directory.refresh();
        directory.finish_refresh(
            request.ticket,
            Ok(ids.iter().map(|id| summary(id, id)).collect()),
        );
        directory
    }

    fn ids(directory: &SessionDirectory) -> Vec<&str> {
        directory.sessions().iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_refresh_replaces_list() {
        let mut directory = loaded(&["a", "b", "c"]);
        let request = directory.refresh();
        directory.finish_refresh(request.ticket, Ok(vec![summary("d", "D"), summary("a", "A")]));
        assert_eq!(ids(&directory), vec!["d", "a"]);
    }

    #[test]
    fn test_refresh_failure_keeps_list() {
        let mut directory = loaded(&["a", "b"]);
        let request = directory.refresh();
        assert!(directory.is_loading());
        directory.finish_refresh(request.ticket, Err(ApiError::Transport("refused".into())));
        assert_eq!(ids(&directory), vec!["a", "b"]);
        assert!(!directory.is_loading());
    }

    #[test]
    fn test_newest_refresh_wins() {
        let mut directory = SessionDirectory::new();
        let older = directory.refresh();
        let newer = directory.refresh();
        assert!(older.token.is_cancelled());

        assert!(directory.finish_refresh(newer.ticket, Ok(vec![summary("new", "New")])));
        assert!(!directory.finish_refresh(older.ticket, Ok(vec![summary("old", "Old")])));
        assert_eq!(ids(&directory), vec!["new"]);
    }

    #[test]
    fn test_remove_success_drops_entry() {
        let mut directory = loaded(&["s1", "s2"]);
        let request = directory.remove("s1").unwrap();
        assert!(directory.is_deleting("s1"));
        assert!(directory.finish_remove(&request.session_id, Ok(())));
        assert_eq!(ids(&directory), vec!["s2"]);
        assert!(!directory.is_deleting("s1"));
    }

    #[test]
    fn test_remove_failure_keeps_entry() {
        let mut directory = loaded(&["s1"]);
        directory.remove("s1").unwrap();
        assert!(!directory.finish_remove(
            "s1",
            Err(ApiError::Status {
                status: 500,
                message: "boom".into()
            })
        ));
        assert_eq!(ids(&directory), vec!["s1"]);
    }

    #[test]
    fn test_duplicate_remove_is_ignored() {
        let mut directory = loaded(&["s1"]);
        assert!(directory.remove("s1").is_some());
        assert!(directory.remove("s1").is_none());
        directory.finish_remove("s1", Err(ApiError::Transport("reset".into())));
        assert!(directory.remove("s1").is_some());
    }

    #[test]
    fn test_refresh_started_before_delete_does_not_restore_entry() {
        let mut directory = loaded(&["s1", "s2"]);
        let request = directory.refresh();
        directory.remove("s1").unwrap();
        assert!(directory.finish_remove("s1", Ok(())));
        assert_eq!(ids(&directory), vec!["s2"]);

        directory.finish_refresh(
            request.ticket,
            Ok(vec![summary("s1", "S1"), summary("s2", "S2")]),
        );
        assert_eq!(ids(&directory), vec!["s2"]);

        let request = directory.refresh();
        directory.finish_refresh(request.ticket, Ok(vec![summary("s1", "S1")]));
        assert_eq!(ids(&directory), vec!["s1"]);
    }

    #[test]
    fn test_select_and_new_chat_emit_events() {
        let directory = SessionDirectory::new();
        assert_eq!(
            directory.select("anything"),
            DirectoryEvent::SelectionRequested("anything".to_string())
        );
        assert_eq!(directory.new_chat(), DirectoryEvent::NewChatRequested);
    }

    #[test]
    fn test_placeholder_and_footer() {
        let mut directory = SessionDirectory::new();
        assert_eq!(directory.placeholder(), Some(EMPTY_DIRECTORY_TEXT));
        let request = directory.refresh();
        assert_eq!(directory.placeholder(), Some(LOADING_DIRECTORY_TEXT));
        directory.finish_refresh(request.ticket, Ok(vec![summary("a", "A")]));
        assert_eq!(directory.placeholder(), None);
        assert_eq!(directory.footer(), "1 chat");
    }

    #[test]
    fn test_toggle_collapsed() {
        let mut directory = SessionDirectory::new();
        assert!(!directory.is_collapsed());
        directory.toggle_collapsed();
        assert!(directory.is_collapsed());
    }
}
