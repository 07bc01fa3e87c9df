//! Backend contract.
//!
//! `ChatBackend` is the seam between the client state machines and the
//! transport. `HttpBackend` speaks the HTTP contract; tests substitute their
//! own implementations.

mod error;
mod http;
mod wire;

use async_trait::async_trait;
pub use error::{ApiError, ApiResult};
pub use http::{HttpBackend, USER_AGENT};
pub use wire::parse_timestamp;

use crate::session::{PredictReply, PredictRequest, SessionHistory, SessionSummary};

/// Operations offered by the chat backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Lists stored sessions, most recently updated first.
    async fn list_sessions(&self) -> ApiResult<Vec<SessionSummary>>;

    /// Fetches the full history of one session.
    async fn load_session(&self, session_id: &str) -> ApiResult<SessionHistory>;

    /// Deletes a session.
    async fn delete_session(&self, session_id: &str) -> ApiResult<()>;

    /// Sends one message and waits for the assistant's reply.
    async fn predict(&self, request: &PredictRequest) -> ApiResult<PredictReply>;
}
