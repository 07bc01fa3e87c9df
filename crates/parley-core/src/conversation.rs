//! Active conversation state machine.
//!
//! The controller never performs I/O itself. Commands that need the backend
//! return a [`ConversationRequest`] describing the call; the caller runs it
//! and feeds the outcome back through `finish_send` / `finish_load` with the
//! same ticket. Results carrying a ticket that is no longer outstanding are
//! dropped.

use tokio_util::sync::CancellationToken;

use crate::api::ApiResult;
use crate::session::{DEFAULT_TITLE, Message, PredictReply, PredictRequest, SessionHistory};
use crate::task::{CancellationHandle, TaskId, TaskSeq};

/// Request status of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    /// A predict request is outstanding and may be cancelled.
    Sending,
    /// A history request is outstanding.
    Loading,
    /// The last load failed. Cleared by the next operation.
    Error,
}

/// Conversation contents owned by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub session_id: Option<String>,
    pub title: String,
    pub messages: Vec<Message>,
    pub status: Status,
}

/// Backend call issued by a controller command.
#[derive(Debug, Clone)]
pub enum ConversationRequest {
    Load {
        ticket: TaskId,
        token: CancellationToken,
        session_id: String,
    },
    Predict {
        ticket: TaskId,
        token: CancellationToken,
        request: PredictRequest,
    },
}

impl ConversationRequest {
    pub fn ticket(&self) -> TaskId {
        match self {
            ConversationRequest::Load { ticket, .. } | ConversationRequest::Predict { ticket, .. } => {
                *ticket
            }
        }
    }
}

#[derive(Debug)]
enum PendingKind {
    Send,
    Load { session_id: String },
}

#[derive(Debug)]
struct Pending {
    handle: CancellationHandle,
    kind: PendingKind,
}

/// Owns the active conversation and its single outstanding request.
#[derive(Debug, Default)]
pub struct ConversationController {
    state: ConversationState,
    draft: String,
    last_error: Option<String>,
    pending: Option<Pending>,
    seq: TaskSeq,
}

impl ConversationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    pub fn session_id(&self) -> Option<&str> {
        self.state.session_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.state.title
    }

    /// Returns the title, or the default header text for unnamed conversations.
    pub fn display_title(&self) -> &str {
        if self.state.title.is_empty() {
            DEFAULT_TITLE
        } else {
            &self.state.title
        }
    }

    pub fn status(&self) -> Status {
        self.state.status
    }

    /// Reason for the current `Error` status.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns true while a send or load is outstanding.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Resets to an empty, unnamed conversation.
    ///
    /// Any outstanding request is cancelled first. The draft is kept.
    pub fn start_new(&mut self) {
        self.abort_pending();
        self.state = ConversationState::default();
        self.last_error = None;
        tracing::debug!("conversation reset");
    }

    /// Starts loading a stored session, replacing whatever is outstanding.
    pub fn load_session(&mut self, session_id: impl Into<String>) -> ConversationRequest {
        let session_id = session_id.into();
        self.abort_pending();
        let handle = CancellationHandle::new(self.seq.next_id());
        let request = ConversationRequest::Load {
            ticket: handle.id(),
            token: handle.token(),
            session_id: session_id.clone(),
        };
        self.pending = Some(Pending {
            handle,
            kind: PendingKind::Load {
                session_id: session_id.clone(),
            },
        });
        self.state.status = Status::Loading;
        self.last_error = None;
        tracing::debug!(%session_id, ticket = request.ticket().0, "loading session");
        request
    }

    /// Applies a history response. Returns false when the ticket is stale.
    pub fn finish_load(&mut self, ticket: TaskId, result: ApiResult<SessionHistory>) -> bool {
        let Some(session_id) = self.take_pending(ticket, |kind| match kind {
            PendingKind::Load { session_id } => Some(session_id.clone()),
            PendingKind::Send => None,
        }) else {
            tracing::debug!(ticket = ticket.0, "dropping stale load result");
            return false;
        };

        match result {
            Ok(history) => {
                self.state = ConversationState {
                    session_id: Some(session_id),
                    title: history.title,
                    messages: history.messages,
                    status: Status::Idle,
                };
            }
            Err(e) if e.is_cancelled() => {
                self.state.status = Status::Idle;
            }
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "failed to load session");
                self.state.status = Status::Error;
                self.last_error = Some(format!("Could not load conversation: {e}"));
            }
        }
        true
    }

    /// Sends `text` as a user message.
    ///
    /// Returns `None` without touching state when `text` is blank or a
    /// request is already outstanding.
    pub fn send(&mut self, text: &str) -> Option<ConversationRequest> {
        if text.trim().is_empty() || self.is_busy() {
            return None;
        }

        self.state.messages.push(Message::user(text));
        self.draft.clear();
        self.state.status = Status::Sending;
        self.last_error = None;

        let handle = CancellationHandle::new(self.seq.next_id());
        let request = ConversationRequest::Predict {
            ticket: handle.id(),
            token: handle.token(),
            request: PredictRequest {
                input: text.to_string(),
                session_id: self.state.session_id.clone(),
            },
        };
        self.pending = Some(Pending {
            handle,
            kind: PendingKind::Send,
        });
        tracing::debug!(ticket = request.ticket().0, "sending message");
        Some(request)
    }

    /// Sends the current draft.
    pub fn submit(&mut self) -> Option<ConversationRequest> {
        let text = self.draft.clone();
        self.send(&text)
    }

    /// Applies a predict response. Returns false when the ticket is stale.
    pub fn finish_send(&mut self, ticket: TaskId, result: ApiResult<PredictReply>) -> bool {
        if self
            .take_pending(ticket, |kind| matches!(kind, PendingKind::Send).then_some(()))
            .is_none()
        {
            tracing::debug!(ticket = ticket.0, "dropping stale send result");
            return false;
        }

        match result {
            Ok(reply) => {
                self.state.messages.push(Message::assistant(reply.prediction));
                if self.state.session_id.is_none()
                    && let Some(session_id) = reply.session_id
                {
                    tracing::debug!(%session_id, "conversation assigned a session");
                    self.state.session_id = Some(session_id);
                    self.state.title = reply.chat_title.unwrap_or_default();
                }
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                tracing::warn!(error = %e, "send failed");
                self.state.messages.push(Message::failure());
            }
        }
        self.state.status = Status::Idle;
        true
    }

    /// Aborts an outstanding send. Returns false when nothing is being sent.
    pub fn cancel(&mut self) -> bool {
        if !matches!(
            self.pending,
            Some(Pending {
                kind: PendingKind::Send,
                ..
            })
        ) {
            return false;
        }
        self.abort_pending();
        self.state.status = Status::Idle;
        tracing::debug!("send cancelled");
        true
    }

    fn abort_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.cancel();
            tracing::debug!(ticket = pending.handle.id().0, "request superseded");
        }
    }

    /// Clears the pending slot if it holds `ticket` and `accept` matches its kind.
    fn take_pending<T>(
        &mut self,
        ticket: TaskId,
        accept: impl FnOnce(&PendingKind) -> Option<T>,
    ) -> Option<T> {
        let pending = self.pending.as_ref()?;
        if pending.handle.id() != ticket {
            return None;
        }
        let value = accept(&pending.kind)?;
        self.pending = None;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::api::ApiError;
    use crate::session::{EMPTY_REPLY_TEXT, FAILED_REPLY_TEXT, Role};

    fn predict_ticket(request: &ConversationRequest) -> TaskId {
        match request {
            ConversationRequest::Predict { ticket, .. } => *ticket,
            other => panic!("expected predict request, got {other:?}"),
        }
    }

    fn reply(prediction: &str, session_id: Option<&str>, title: Option<&str>) -> PredictReply {
        PredictReply {
            prediction: prediction.to_string(),
            session_id: session_id.map(str::to_string),
            chat_title: title.map(str::to_string),
        }
    }

    fn history(title: &str, contents: &[(&str, Role)]) -> SessionHistory {
        SessionHistory {
            title: title.to_string(),
            messages: contents
                .iter()
                .enumerate()
                .map(|(i, (content, role))| Message {
                    id: format!("{i}_{role}"),
                    content: (*content).to_string(),
                    role: *role,
                    created_at: Utc::now(),
                    failed: false,
                })
                .collect(),
        }
    }

    #[test]
    fn test_send_appends_user_message_before_response() {
        let mut controller = ConversationController::new();
        controller.set_draft("hello");
        let request = controller.submit().unwrap();

        assert_eq!(controller.messages().len(), 1);
        assert_eq!(controller.messages()[0].role, Role::User);
        assert_eq!(controller.messages()[0].content, "hello");
        assert_eq!(controller.draft(), "");
        assert_eq!(controller.status(), Status::Sending);
        match request {
            ConversationRequest::Predict { request, .. } => {
                assert_eq!(request.input, "hello");
                assert_eq!(request.session_id, None);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_blank_send_is_rejected() {
        let mut controller = ConversationController::new();
        controller.set_draft("   \n\t");
        assert!(controller.submit().is_none());
        assert!(controller.messages().is_empty());
        assert_eq!(controller.draft(), "   \n\t");
        assert_eq!(controller.status(), Status::Idle);
    }

    #[test]
    fn test_send_while_sending_is_noop() {
        let mut controller = ConversationController::new();
        controller.send("first").unwrap();
        assert!(controller.send("second").is_none());
        assert_eq!(controller.messages().len(), 1);
        assert_eq!(controller.status(), Status::Sending);
    }

    #[test]
    fn test_first_send_adopts_identity() {
        let mut controller = ConversationController::new();
        let ticket = predict_ticket(&controller.send("hello").unwrap());
        assert!(controller.finish_send(ticket, Ok(reply("hi", Some("s1"), Some("Greeting")))));

        let state = controller.state();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].content, "hello");
        assert_eq!(state.messages[1].role, Role::Assistant);
        assert_eq!(state.messages[1].content, "hi");
        assert_eq!(state.session_id.as_deref(), Some("s1"));
        assert_eq!(state.title, "Greeting");
        assert_eq!(state.status, Status::Idle);
        assert!(!controller.is_busy());
    }

    #[test]
    fn test_identity_is_assigned_once() {
        let mut controller = ConversationController::new();
        let ticket = predict_ticket(&controller.send("hello").unwrap());
        controller.finish_send(ticket, Ok(reply("hi", Some("s1"), Some("Greeting"))));

        let request = controller.send("again").unwrap();
        match &request {
            ConversationRequest::Predict { request, .. } => {
                assert_eq!(request.session_id.as_deref(), Some("s1"));
            }
            other => panic!("unexpected request {other:?}"),
        }
        controller.finish_send(
            request.ticket(),
            Ok(reply("sure", Some("other"), Some("Renamed"))),
        );
        assert_eq!(controller.session_id(), Some("s1"));
        assert_eq!(controller.title(), "Greeting");
    }

    #[test]
    fn test_empty_prediction_uses_placeholder() {
        let mut controller = ConversationController::new();
        let ticket = predict_ticket(&controller.send("hello").unwrap());
        controller.finish_send(ticket, Ok(reply("", None, None)));
        assert_eq!(controller.messages()[1].content, EMPTY_REPLY_TEXT);
        assert_eq!(controller.session_id(), None);
    }

    #[test]
    fn test_failed_send_appends_one_failure() {
        let mut controller = ConversationController::new();
        let ticket = predict_ticket(&controller.send("hello").unwrap());
        controller.finish_send(ticket, Err(ApiError::Transport("refused".into())));

        let messages = controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages.iter().filter(|m| m.failed).count(), 1);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, FAILED_REPLY_TEXT);
        assert_eq!(controller.status(), Status::Idle);
    }

    #[test]
    fn test_cancel_during_send_appends_nothing() {
        let mut controller = ConversationController::new();
        let request = controller.send("hello").unwrap();
        let ConversationRequest::Predict { ticket, token, .. } = request else {
            panic!("expected predict request");
        };

        assert!(controller.cancel());
        assert!(token.is_cancelled());
        assert_eq!(controller.status(), Status::Idle);
        assert_eq!(controller.messages().len(), 1);

        // The aborted worker still reports back; it must be ignored.
        assert!(!controller.finish_send(ticket, Err(ApiError::Cancelled)));
        assert!(!controller.finish_send(ticket, Ok(reply("late", Some("s1"), None))));
        assert_eq!(controller.messages().len(), 1);
        assert_eq!(controller.session_id(), None);
    }

    #[test]
    fn test_cancel_when_idle_or_loading_is_rejected() {
        let mut controller = ConversationController::new();
        assert!(!controller.cancel());
        controller.load_session("s1");
        assert!(!controller.cancel());
        assert_eq!(controller.status(), Status::Loading);
    }

    #[test]
    fn test_start_new_resets_identity_and_cancels() {
        let mut controller = ConversationController::new();
        let ticket = predict_ticket(&controller.send("hello").unwrap());
        controller.finish_send(ticket, Ok(reply("hi", Some("s1"), Some("Greeting"))));
        assert_eq!(controller.session_id(), Some("s1"));

        let request = controller.send("more").unwrap();
        let ConversationRequest::Predict { ticket, token, .. } = request else {
            panic!("expected predict request");
        };
        controller.start_new();

        assert!(token.is_cancelled());
        assert_eq!(controller.session_id(), None);
        assert_eq!(controller.title(), "");
        assert!(controller.messages().is_empty());
        assert_eq!(controller.status(), Status::Idle);
        assert!(!controller.finish_send(ticket, Ok(reply("late", None, None))));
        assert!(controller.messages().is_empty());
    }

    #[test]
    fn test_load_replaces_state() {
        let mut controller = ConversationController::new();
        controller.send("draft chat").unwrap();

        let request = controller.load_session("s1");
        assert_eq!(controller.status(), Status::Loading);
        let loaded = history("Greeting", &[("hello", Role::User), ("hi", Role::Assistant)]);
        assert!(controller.finish_load(request.ticket(), Ok(loaded.clone())));

        assert_eq!(controller.session_id(), Some("s1"));
        assert_eq!(controller.title(), "Greeting");
        assert_eq!(controller.messages(), loaded.messages.as_slice());
        assert_eq!(controller.status(), Status::Idle);
    }

    #[test]
    fn test_load_twice_is_idempotent() {
        let loaded = history("Greeting", &[("hello", Role::User), ("hi", Role::Assistant)]);
        let mut controller = ConversationController::new();
        for _ in 0..2 {
            let request = controller.load_session("s1");
            controller.finish_load(request.ticket(), Ok(loaded.clone()));
        }
        assert_eq!(controller.messages(), loaded.messages.as_slice());
    }

    #[test]
    fn test_load_failure_keeps_contents() {
        let mut controller = ConversationController::new();
        let ticket = predict_ticket(&controller.send("hello").unwrap());
        controller.finish_send(ticket, Ok(reply("hi", Some("s1"), Some("Greeting"))));
        let before = controller.state().clone();

        let request = controller.load_session("s2");
        controller.finish_load(
            request.ticket(),
            Err(ApiError::Status {
                status: 404,
                message: "Session not found".into(),
            }),
        );

        assert_eq!(controller.status(), Status::Error);
        assert_eq!(controller.messages(), before.messages.as_slice());
        assert_eq!(controller.session_id(), Some("s1"));
        assert!(controller.last_error().unwrap().contains("Session not found"));

        // Next operation clears the error.
        controller.send("retry").unwrap();
        assert_eq!(controller.status(), Status::Sending);
        assert!(controller.last_error().is_none());
    }

    #[test]
    fn test_newer_load_supersedes_older() {
        let mut controller = ConversationController::new();
        let first = controller.load_session("s1");
        let second = controller.load_session("s2");

        assert!(!controller.finish_load(first.ticket(), Ok(history("One", &[]))));
        assert_eq!(controller.status(), Status::Loading);
        assert!(controller.finish_load(second.ticket(), Ok(history("Two", &[]))));
        assert_eq!(controller.session_id(), Some("s2"));
        assert_eq!(controller.title(), "Two");
    }

    #[test]
    fn test_load_during_send_drops_send_result() {
        let mut controller = ConversationController::new();
        let send_ticket = predict_ticket(&controller.send("hello").unwrap());
        let load = controller.load_session("s9");

        assert!(!controller.finish_send(send_ticket, Ok(reply("hi", Some("s1"), None))));
        assert!(controller.finish_load(load.ticket(), Ok(history("Nine", &[]))));
        assert_eq!(controller.session_id(), Some("s9"));
        assert!(controller.messages().is_empty());
    }

    #[test]
    fn test_mismatched_kind_is_stale() {
        let mut controller = ConversationController::new();
        let load = controller.load_session("s1");
        assert!(!controller.finish_send(load.ticket(), Ok(reply("hi", None, None))));
        assert!(controller.is_busy());
        assert_eq!(controller.status(), Status::Loading);
    }

    #[test]
    fn test_display_title_defaults() {
        let mut controller = ConversationController::new();
        assert_eq!(controller.display_title(), DEFAULT_TITLE);
        let ticket = predict_ticket(&controller.send("hello").unwrap());
        controller.finish_send(ticket, Ok(reply("hi", Some("s1"), Some("Greeting"))));
        assert_eq!(controller.display_title(), "Greeting");
    }
}
