//! Ticketed background work.
//!
//! Every asynchronous request is tagged with a `TaskId`. A completion is only
//! applied when its id is still the active one for that slot; anything else is
//! a stale result from a superseded or cancelled request and is dropped.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

#[derive(Debug, Default)]
pub struct TaskSeq {
    next: u64,
}

impl TaskSeq {
    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// Ticket plus token for one outstanding request.
///
/// Created when the request is issued and dropped on every exit path; a
/// handle is never reused for a second request.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    id: TaskId,
    token: CancellationToken,
}

impl CancellationHandle {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Lifecycle of a single task slot.
#[derive(Debug, Default, Clone)]
pub struct TaskState {
    active: Option<TaskId>,
    cancel: Option<CancellationToken>,
}

impl TaskState {
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Marks `id` active and returns the token the worker should observe.
    ///
    /// Any previously active task is cancelled.
    pub fn start(&mut self, id: TaskId) -> CancellationToken {
        self.cancel_active();
        let token = CancellationToken::new();
        self.active = Some(id);
        self.cancel = Some(token.clone());
        token
    }

    /// Clears the slot if `id` is the active task. Returns false for stale ids.
    pub fn finish_if_active(&mut self, id: TaskId) -> bool {
        let ok = self.active == Some(id);
        if ok {
            self.active = None;
            self.cancel = None;
        }
        ok
    }

    /// Cancels and clears the active task, if any.
    pub fn cancel_active(&mut self) -> bool {
        let had_task = self.active.take().is_some();
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        had_task
    }
}

/// Runs `fut` until it completes or `token` is cancelled.
///
/// Cancellation wins ties, so a cancelled request never reports success.
pub async fn cancellable<T, F>(token: CancellationToken, fut: F) -> ApiResult<T>
where
    F: Future<Output = ApiResult<T>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(ApiError::Cancelled),
        result = fut => result,
    }
}
