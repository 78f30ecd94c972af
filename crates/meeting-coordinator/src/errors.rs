//! Meeting coordinator error types.
//!
//! Nothing in the coordinator is process-fatal. Not-found conditions are
//! logged and skipped by the event handlers, enqueue timeouts are reported to
//! the producer and the event is dropped.

use thiserror::Error;

/// Meeting coordinator error type.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Meeting not found (exact id or unique prefix).
    #[error("Meeting not found: {0}")]
    MeetingNotFound(String),

    /// User not found in the given meeting.
    #[error("User {user_id} not found in meeting {meeting_id}")]
    UserNotFound { meeting_id: String, user_id: String },

    /// The intake queue did not accept the event within the enqueue timeout.
    #[error("Event queue full, dropped {event_type} after {timeout_ms}ms")]
    EnqueueTimeout {
        event_type: &'static str,
        timeout_ms: u64,
    },

    /// A request needs a reply and no worker is running, or the queue is closed.
    #[error("Event processor stopped")]
    ProcessorStopped,

    /// The worker did not answer a request within the timeout.
    #[error("No reply to {event_type} within {timeout_ms}ms")]
    ReplyTimeout {
        event_type: &'static str,
        timeout_ms: u64,
    },

    /// `start()` was called while a worker is already running.
    #[error("Event processor already running")]
    AlreadyRunning,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    /// Whether this error is an entity-absent condition (meeting or user).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoordinatorError::MeetingNotFound(_) | CoordinatorError::UserNotFound { .. }
        )
    }
}
