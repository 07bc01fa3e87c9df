//! Headless chat runtime.
//!
//! `ChatClient` composes the session directory and the conversation
//! controller, runs their backend requests as tokio tasks, and applies the
//! results from a single inbox. Front ends (TUI, CLI) call the command methods
//! and either drain the inbox each frame with [`ChatClient::pump`] or await it
//! with [`ChatClient::recv`].
//!
//! Whenever the active session id changes the directory is refreshed, so a
//! conversation that just received its identity shows up in the listing.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::{ApiResult, ChatBackend};
use crate::conversation::{ConversationController, ConversationRequest};
use crate::directory::{DirectoryEvent, SessionDirectory};
use crate::session::{PredictReply, SessionHistory, SessionSummary};
use crate::task::{TaskId, cancellable};

/// Completion of a background request.
#[derive(Debug)]
pub enum ClientEvent {
    SessionsListed {
        ticket: TaskId,
        result: ApiResult<Vec<SessionSummary>>,
    },
    SessionDeleted {
        session_id: String,
        result: ApiResult<()>,
    },
    HistoryLoaded {
        ticket: TaskId,
        result: ApiResult<SessionHistory>,
    },
    ReplyReceived {
        ticket: TaskId,
        result: ApiResult<PredictReply>,
    },
}

pub struct ChatClient {
    backend: Arc<dyn ChatBackend>,
    directory: SessionDirectory,
    conversation: ConversationController,
    inbox_tx: mpsc::UnboundedSender<ClientEvent>,
    inbox_rx: mpsc::UnboundedReceiver<ClientEvent>,
    /// Session id the directory was last refreshed for.
    synced_session: Option<String>,
    pending_deletes: usize,
}

impl ChatClient {
    /// Creates a client. Must be called inside a tokio runtime before any command.
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            directory: SessionDirectory::new(),
            conversation: ConversationController::new(),
            inbox_tx,
            inbox_rx,
            synced_session: None,
            pending_deletes: 0,
        }
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    pub fn conversation(&self) -> &ConversationController {
        &self.conversation
    }

    /// Mutable access for draft editing.
    pub fn conversation_mut(&mut self) -> &mut ConversationController {
        &mut self.conversation
    }

    /// Returns true when no request of any kind is outstanding.
    pub fn is_idle(&self) -> bool {
        !self.conversation.is_busy() && !self.directory.is_loading() && self.pending_deletes == 0
    }

    pub fn toggle_sidebar(&mut self) {
        self.directory.toggle_collapsed();
    }

    pub fn refresh_sessions(&mut self) {
        let request = self.directory.refresh();
        let backend = Arc::clone(&self.backend);
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = cancellable(request.token, backend.list_sessions()).await;
            let _ = tx.send(ClientEvent::SessionsListed {
                ticket: request.ticket,
                result,
            });
        });
    }

    /// Switches the conversation to a stored session.
    pub fn select_session(&mut self, session_id: impl Into<String>) {
        let event = self.directory.select(session_id);
        self.handle_directory_event(event);
    }

    pub fn new_chat(&mut self) {
        let event = self.directory.new_chat();
        self.handle_directory_event(event);
    }

    /// Deletes a stored session. The open conversation is left alone.
    pub fn delete_session(&mut self, session_id: impl Into<String>) {
        let Some(request) = self.directory.remove(session_id) else {
            return;
        };
        self.pending_deletes += 1;
        let backend = Arc::clone(&self.backend);
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = backend.delete_session(&request.session_id).await;
            let _ = tx.send(ClientEvent::SessionDeleted {
                session_id: request.session_id,
                result,
            });
        });
    }

    /// Sends `text`. Returns false if the controller rejected it.
    pub fn send(&mut self, text: &str) -> bool {
        match self.conversation.send(text) {
            Some(request) => {
                self.dispatch(request);
                true
            }
            None => false,
        }
    }

    /// Sends the draft. Returns false if the controller rejected it.
    pub fn submit(&mut self) -> bool {
        match self.conversation.submit() {
            Some(request) => {
                self.dispatch(request);
                true
            }
            None => false,
        }
    }

    /// Cancels an outstanding send.
    pub fn cancel(&mut self) -> bool {
        self.conversation.cancel()
    }

    /// Applies every completion already in the inbox. Returns true if any arrived.
    pub fn pump(&mut self) -> bool {
        let mut applied = false;
        while let Ok(event) = self.inbox_rx.try_recv() {
            self.apply(event);
            applied = true;
        }
        applied
    }

    /// Waits for the next completion and applies it.
    pub async fn recv(&mut self) {
        if let Some(event) = self.inbox_rx.recv().await {
            self.apply(event);
        }
    }

    /// Applies completions until nothing is outstanding.
    pub async fn settle(&mut self) {
        while !self.is_idle() {
            self.recv().await;
        }
    }

    /// Routes a directory notification to the conversation.
    pub fn handle_directory_event(&mut self, event: DirectoryEvent) {
        match event {
            DirectoryEvent::SelectionRequested(session_id) => {
                let request = self.conversation.load_session(session_id);
                self.dispatch(request);
            }
            DirectoryEvent::NewChatRequested => self.conversation.start_new(),
        }
        self.sync_directory();
    }

    fn apply(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::SessionsListed { ticket, result } => {
                self.directory.finish_refresh(ticket, result);
            }
            ClientEvent::SessionDeleted { session_id, result } => {
                self.pending_deletes = self.pending_deletes.saturating_sub(1);
                self.directory.finish_remove(&session_id, result);
            }
            ClientEvent::HistoryLoaded { ticket, result } => {
                self.conversation.finish_load(ticket, result);
            }
            ClientEvent::ReplyReceived { ticket, result } => {
                self.conversation.finish_send(ticket, result);
            }
        }
        self.sync_directory();
    }

    fn dispatch(&self, request: ConversationRequest) {
        let backend = Arc::clone(&self.backend);
        let tx = self.inbox_tx.clone();
        match request {
            ConversationRequest::Load {
                ticket,
                token,
                session_id,
            } => {
                tokio::spawn(async move {
                    let result = cancellable(token, backend.load_session(&session_id)).await;
                    let _ = tx.send(ClientEvent::HistoryLoaded { ticket, result });
                });
            }
            ConversationRequest::Predict {
                ticket,
                token,
                request,
            } => {
                tokio::spawn(async move {
                    let result = cancellable(token, backend.predict(&request)).await;
                    let _ = tx.send(ClientEvent::ReplyReceived { ticket, result });
                });
            }
        }
    }

    fn sync_directory(&mut self) {
        let current = self.conversation.session_id();
        if current == self.synced_session.as_deref() {
            return;
        }
        tracing::debug!(session_id = ?current, "active session changed");
        self.synced_session = current.map(str::to_string);
        self.refresh_sessions();
    }
}
