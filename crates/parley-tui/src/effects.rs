//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes
//! against the `ChatClient`. Anything that issues a backend request is an
//! effect; the reducer itself never spawns.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    Quit,
    /// Send the current draft.
    SubmitDraft,
    /// Abort the outstanding send.
    CancelSend,
    NewChat,
    SelectSession { session_id: String },
    DeleteSession { session_id: String },
    RefreshSessions,
}
