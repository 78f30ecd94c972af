//! Message types for the event processor.
//!
//! [`MeetingEvent`] is the lifecycle event union. It is plain data and can be
//! decoded straight from the notification transport's JSON payloads.
//! [`ProcessorMessage`] wraps it together with control requests that reply
//! through `tokio::sync::oneshot` channels.

use crate::domain::Meeting;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::oneshot;

/// Lifecycle events applied by the event processor, one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeetingEvent {
    /// Insert a new meeting into the registry.
    CreateMeeting { meeting: Box<Meeting> },

    /// End a meeting on request (API or exceeded duration).
    EndMeeting { meeting_id: String },

    /// The conference started (or restarted).
    MeetingStarted { meeting_id: String },

    /// The conference ended naturally.
    MeetingEnded { meeting_id: String },

    /// The conference was torn down. Accepted and ignored.
    MeetingDestroyed { meeting_id: String },

    UserJoined {
        meeting_id: String,
        user_id: String,
        external_user_id: String,
        name: String,
        role: String,
    },

    UserLeft { meeting_id: String, user_id: String },

    UserStatusChanged {
        meeting_id: String,
        user_id: String,
        status: String,
        value: String,
    },

    /// Merge application-supplied custom data for a user.
    UserCustomDataAdded {
        meeting_id: String,
        user_id: String,
        data: HashMap<String, String>,
    },

    /// Evaluate every meeting against the expiration rules.
    RemoveExpiredMeetings,
}

impl MeetingEvent {
    /// Bounded label for logs and metrics.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            MeetingEvent::CreateMeeting { .. } => "create_meeting",
            MeetingEvent::EndMeeting { .. } => "end_meeting",
            MeetingEvent::MeetingStarted { .. } => "meeting_started",
            MeetingEvent::MeetingEnded { .. } => "meeting_ended",
            MeetingEvent::MeetingDestroyed { .. } => "meeting_destroyed",
            MeetingEvent::UserJoined { .. } => "user_joined",
            MeetingEvent::UserLeft { .. } => "user_left",
            MeetingEvent::UserStatusChanged { .. } => "user_status_changed",
            MeetingEvent::UserCustomDataAdded { .. } => "user_custom_data_added",
            MeetingEvent::RemoveExpiredMeetings => "remove_expired_meetings",
        }
    }
}

/// Everything the worker dequeues.
#[derive(Debug)]
pub enum ProcessorMessage {
    /// A lifecycle event.
    Event(MeetingEvent),

    /// Reply once every message enqueued before this one has been handled.
    Flush { respond_to: oneshot::Sender<()> },

    /// Hand a meeting to the recording ingest pipeline.
    ProcessRecording { meeting_id: String },

    StoreSubscription {
        meeting_id: String,
        event: String,
        callback_url: String,
        respond_to: oneshot::Sender<String>,
    },

    RemoveSubscription {
        meeting_id: String,
        subscription_id: String,
        respond_to: oneshot::Sender<bool>,
    },

    ListSubscriptions {
        meeting_id: String,
        respond_to: oneshot::Sender<Vec<HashMap<String, String>>>,
    },

    /// Publish a raw message on a channel.
    Send { channel: String, message: String },

    /// Broadcast a newly created poll.
    SendPolls {
        meeting_id: String,
        title: String,
        question: String,
        question_type: String,
        answers: Vec<String>,
    },
}

impl ProcessorMessage {
    /// Bounded label for logs and metrics.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            ProcessorMessage::Event(event) => event.event_type(),
            ProcessorMessage::Flush { .. } => "flush",
            ProcessorMessage::ProcessRecording { .. } => "process_recording",
            ProcessorMessage::StoreSubscription { .. } => "store_subscription",
            ProcessorMessage::RemoveSubscription { .. } => "remove_subscription",
            ProcessorMessage::ListSubscriptions { .. } => "list_subscriptions",
            ProcessorMessage::Send { .. } => "send",
            ProcessorMessage::SendPolls { .. } => "send_polls",
        }
    }
}

impl From<MeetingEvent> for ProcessorMessage {
    fn from(event: MeetingEvent) -> Self {
        ProcessorMessage::Event(event)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_transport_payloads() {
        let joined: MeetingEvent = serde_json::from_str(
            r#"{
                "type": "user_joined",
                "meeting_id": "int-1",
                "user_id": "u-1",
                "external_user_id": "ext-u-1",
                "name": "Alice",
                "role": "MODERATOR"
            }"#,
        )
        .unwrap();
        assert_eq!(joined.event_type(), "user_joined");

        let sweep: MeetingEvent =
            serde_json::from_str(r#"{"type": "remove_expired_meetings"}"#).unwrap();
        assert_eq!(sweep, MeetingEvent::RemoveExpiredMeetings);
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let result: Result<MeetingEvent, _> =
            serde_json::from_str(r#"{"type": "meeting_paused", "meeting_id": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_processor_message_labels() {
        let (tx, _rx) = oneshot::channel();
        assert_eq!(ProcessorMessage::Flush { respond_to: tx }.event_type(), "flush");

        let message: ProcessorMessage = MeetingEvent::MeetingEnded {
            meeting_id: "m".to_string(),
        }
        .into();
        assert_eq!(message.event_type(), "meeting_ended");
    }
}
