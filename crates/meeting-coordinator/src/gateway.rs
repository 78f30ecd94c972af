//! Outbound gateway to the messaging and recording collaborators.
//!
//! Every call is synchronous and fire-and-forget from the coordinator's point
//! of view. Retries and durability belong to the implementation; a failed send
//! is logged by the collaborator and never re-enters the event stream.
//!
//! Meeting lifecycle calls are made only from the event processor worker.

use crate::recording::Recording;
use std::collections::HashMap;
use tracing::info;

/// Commands published to the messaging transport.
pub trait MessagingGateway: Send + Sync {
    fn create_meeting(
        &self,
        meeting_id: &str,
        name: &str,
        record: bool,
        voice_bridge: &str,
        duration: u64,
    );

    fn end_meeting(&self, meeting_id: &str);

    fn destroy_meeting(&self, meeting_id: &str);

    /// Store recording annotation metadata for a recorded meeting.
    fn record_meeting_info(&self, meeting_id: &str, metadata: &HashMap<String, String>);

    /// Register a webhook subscription, returning its subscription ID.
    fn store_subscription(&self, meeting_id: &str, event: &str, callback_url: &str) -> String;

    fn remove_subscription(&self, meeting_id: &str, subscription_id: &str) -> bool;

    fn list_subscriptions(&self, meeting_id: &str) -> Vec<HashMap<String, String>>;

    /// Publish a raw message on a channel.
    fn send(&self, channel: &str, message: &str);

    fn send_polls(
        &self,
        meeting_id: &str,
        title: &str,
        question: &str,
        question_type: &str,
        answers: &[String],
    );
}

/// Recording pipeline trigger plus queries against persisted recording metadata.
pub trait RecordingGateway: Send + Sync {
    /// Hand a finished meeting to the ingest/processing pipeline.
    fn start_ingest_and_processing(&self, meeting_id: &str);

    /// Raw recording rows for the given meeting IDs, one row per playback format.
    fn get_recordings(&self, meeting_ids: &[String]) -> Vec<Recording>;

    fn exists_any_recording(&self, meeting_ids: &[String]) -> bool;

    fn publish(&self, recording_id: &str, publish: bool);

    fn delete(&self, recording_id: &str);
}

/// Messaging gateway that only logs; used when no transport is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMessagingGateway;

impl MessagingGateway for TracingMessagingGateway {
    fn create_meeting(
        &self,
        meeting_id: &str,
        name: &str,
        record: bool,
        voice_bridge: &str,
        duration: u64,
    ) {
        info!(
            target: "coordinator.gateway",
            meeting_id = %meeting_id,
            name = %name,
            record,
            voice_bridge = %voice_bridge,
            duration,
            "create_meeting"
        );
    }

    fn end_meeting(&self, meeting_id: &str) {
        info!(target: "coordinator.gateway", meeting_id = %meeting_id, "end_meeting");
    }

    fn destroy_meeting(&self, meeting_id: &str) {
        info!(target: "coordinator.gateway", meeting_id = %meeting_id, "destroy_meeting");
    }

    fn record_meeting_info(&self, meeting_id: &str, metadata: &HashMap<String, String>) {
        info!(
            target: "coordinator.gateway",
            meeting_id = %meeting_id,
            entries = metadata.len(),
            "record_meeting_info"
        );
    }

    fn store_subscription(&self, meeting_id: &str, event: &str, callback_url: &str) -> String {
        let subscription_id = uuid::Uuid::new_v4().to_string();
        info!(
            target: "coordinator.gateway",
            meeting_id = %meeting_id,
            event = %event,
            callback_url = %callback_url,
            subscription_id = %subscription_id,
            "store_subscription"
        );
        subscription_id
    }

    fn remove_subscription(&self, meeting_id: &str, subscription_id: &str) -> bool {
        info!(
            target: "coordinator.gateway",
            meeting_id = %meeting_id,
            subscription_id = %subscription_id,
            "remove_subscription"
        );
        false
    }

    fn list_subscriptions(&self, meeting_id: &str) -> Vec<HashMap<String, String>> {
        info!(target: "coordinator.gateway", meeting_id = %meeting_id, "list_subscriptions");
        Vec::new()
    }

    fn send(&self, channel: &str, message: &str) {
        info!(
            target: "coordinator.gateway",
            channel = %channel,
            bytes = message.len(),
            "send"
        );
    }

    fn send_polls(
        &self,
        meeting_id: &str,
        title: &str,
        _question: &str,
        question_type: &str,
        answers: &[String],
    ) {
        info!(
            target: "coordinator.gateway",
            meeting_id = %meeting_id,
            title = %title,
            question_type = %question_type,
            answers = answers.len(),
            "send_polls"
        );
    }
}

/// Recording gateway that only logs and stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecordingGateway;

impl RecordingGateway for TracingRecordingGateway {
    fn start_ingest_and_processing(&self, meeting_id: &str) {
        info!(
            target: "coordinator.gateway",
            meeting_id = %meeting_id,
            "start_ingest_and_processing"
        );
    }

    fn get_recordings(&self, meeting_ids: &[String]) -> Vec<Recording> {
        info!(target: "coordinator.gateway", ids = meeting_ids.len(), "get_recordings");
        Vec::new()
    }

    fn exists_any_recording(&self, meeting_ids: &[String]) -> bool {
        info!(target: "coordinator.gateway", ids = meeting_ids.len(), "exists_any_recording");
        false
    }

    fn publish(&self, recording_id: &str, publish: bool) {
        info!(
            target: "coordinator.gateway",
            recording_id = %recording_id,
            publish,
            "publish"
        );
    }

    fn delete(&self, recording_id: &str) {
        info!(target: "coordinator.gateway", recording_id = %recording_id, "delete");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_tracing_gateways_are_object_safe() {
        let messaging: Arc<dyn MessagingGateway> = Arc::new(TracingMessagingGateway);
        let recording: Arc<dyn RecordingGateway> = Arc::new(TracingRecordingGateway);

        messaging.create_meeting("m-1", "Weekly", true, "70001", 0);
        let sid = messaging.store_subscription("m-1", "meeting-ended", "https://hooks/x");
        assert!(!sid.is_empty());
        assert!(messaging.list_subscriptions("m-1").is_empty());

        recording.start_ingest_and_processing("m-1");
        assert!(recording.get_recordings(&["m-1".to_string()]).is_empty());
        assert!(!recording.exists_any_recording(&["m-1".to_string()]));
    }
}
