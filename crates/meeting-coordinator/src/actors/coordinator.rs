//! `MeetingCoordinator` - the public handle in front of the event processor.
//!
//! Producers (API tasks, the notification listener, the sweeper) call into
//! the handle from any task. Meeting mutations and lifecycle gateway calls
//! are enqueued for the single [`EventProcessor`] worker; reads are served
//! straight from the registries as snapshots.
//!
//! # Lifecycle
//!
//! The handle owns the queue for its whole life. `start()` spawns a worker
//! that borrows the receiver; `stop()` cancels it, waits for the in-flight
//! message to finish, and takes the receiver back so the processor can be
//! started again. Events enqueued while stopped are kept until the next start
//! (or dropped on timeout once the queue is full).

use crate::config::CoordinatorSettings;
use crate::domain::{Meeting, UserSession};
use crate::errors::CoordinatorError;
use crate::gateway::{MessagingGateway, RecordingGateway};
use crate::observability::metrics;
use crate::recording::{reorder_recordings, Recording};
use crate::registry::{MeetingRegistry, SessionRegistry};

use super::messages::{MeetingEvent, ProcessorMessage};
use super::metrics::QueueMonitor;
use super::processor::EventProcessor;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type Receiver = mpsc::Receiver<ProcessorMessage>;

/// Who holds the queue receiver right now.
enum WorkerSlot {
    Stopped(Receiver),
    Running {
        cancel_token: CancellationToken,
        task: JoinHandle<Receiver>,
    },
    /// The worker task died without handing the receiver back.
    Lost,
}

/// Handle to the meeting coordinator.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct MeetingCoordinator {
    coordinator_id: String,
    sender: mpsc::Sender<ProcessorMessage>,
    worker: Mutex<WorkerSlot>,
    meetings: Arc<MeetingRegistry>,
    sessions: Arc<SessionRegistry>,
    messaging: Arc<dyn MessagingGateway>,
    recordings: Arc<dyn RecordingGateway>,
    settings: CoordinatorSettings,
    monitor: Arc<QueueMonitor>,
}

impl MeetingCoordinator {
    /// Create a stopped coordinator with an empty queue.
    #[must_use]
    pub fn new(
        coordinator_id: impl Into<String>,
        settings: CoordinatorSettings,
        messaging: Arc<dyn MessagingGateway>,
        recordings: Arc<dyn RecordingGateway>,
    ) -> Self {
        let coordinator_id = coordinator_id.into();
        let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));

        Self {
            monitor: Arc::new(QueueMonitor::new(coordinator_id.clone())),
            coordinator_id,
            sender,
            worker: Mutex::new(WorkerSlot::Stopped(receiver)),
            meetings: Arc::new(MeetingRegistry::new()),
            sessions: Arc::new(SessionRegistry::new()),
            messaging,
            recordings,
            settings,
        }
    }

    // ------------------------------------------------------------------
    // Worker lifecycle
    // ------------------------------------------------------------------

    /// Spawn the worker.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if a worker is active, `Internal` if a previous worker
    /// died and took the queue with it.
    pub async fn start(&self) -> Result<(), CoordinatorError> {
        let mut slot = self.worker.lock().await;

        match std::mem::replace(&mut *slot, WorkerSlot::Lost) {
            WorkerSlot::Stopped(receiver) => {
                let cancel_token = CancellationToken::new();
                let processor = EventProcessor::new(
                    self.coordinator_id.clone(),
                    receiver,
                    cancel_token.clone(),
                    Arc::clone(&self.meetings),
                    Arc::clone(&self.messaging),
                    Arc::clone(&self.recordings),
                    self.settings.clone(),
                    Arc::clone(&self.monitor),
                );
                let task = tokio::spawn(processor.run());
                *slot = WorkerSlot::Running { cancel_token, task };

                info!(
                    target: "coordinator.processor",
                    coordinator_id = %self.coordinator_id,
                    "Coordinator started"
                );
                Ok(())
            }
            running @ WorkerSlot::Running { .. } => {
                *slot = running;
                Err(CoordinatorError::AlreadyRunning)
            }
            WorkerSlot::Lost => Err(CoordinatorError::Internal(
                "event queue lost with a failed worker".to_string(),
            )),
        }
    }

    /// Cancel the worker and wait for it to finish its current message.
    ///
    /// Stopping a stopped coordinator is a no-op.
    ///
    /// # Errors
    ///
    /// `Internal` if the worker task failed instead of returning the queue.
    pub async fn stop(&self) -> Result<(), CoordinatorError> {
        let mut slot = self.worker.lock().await;

        match std::mem::replace(&mut *slot, WorkerSlot::Lost) {
            WorkerSlot::Running { cancel_token, task } => {
                cancel_token.cancel();
                match task.await {
                    Ok(receiver) => {
                        *slot = WorkerSlot::Stopped(receiver);
                        info!(
                            target: "coordinator.processor",
                            coordinator_id = %self.coordinator_id,
                            "Coordinator stopped"
                        );
                        Ok(())
                    }
                    Err(e) => {
                        error!(
                            target: "coordinator.processor",
                            coordinator_id = %self.coordinator_id,
                            error = %e,
                            "Event processor task failed"
                        );
                        Err(CoordinatorError::Internal(format!(
                            "event processor task failed: {e}"
                        )))
                    }
                }
            }
            other => {
                *slot = other;
                Ok(())
            }
        }
    }

    /// Whether a worker is currently draining the queue.
    pub async fn is_running(&self) -> bool {
        matches!(*self.worker.lock().await, WorkerSlot::Running { .. })
    }

    // ------------------------------------------------------------------
    // Queued mutations
    // ------------------------------------------------------------------

    /// Enqueue an event for the worker.
    ///
    /// # Errors
    ///
    /// `EnqueueTimeout` if the queue stayed full for the configured timeout
    /// (the event is dropped), `ProcessorStopped` if the queue is gone.
    pub async fn handle(&self, event: MeetingEvent) -> Result<(), CoordinatorError> {
        self.enqueue(event.into()).await
    }

    async fn enqueue(&self, message: ProcessorMessage) -> Result<(), CoordinatorError> {
        let event_type = message.event_type();

        match self
            .sender
            .send_timeout(message, self.settings.enqueue_timeout)
            .await
        {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                self.monitor.record_drop();
                metrics::record_event_dropped(event_type);
                let timeout_ms =
                    u64::try_from(self.settings.enqueue_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(
                    target: "coordinator.processor",
                    coordinator_id = %self.coordinator_id,
                    event_type,
                    timeout_ms,
                    "Event queue full, dropping event"
                );
                Err(CoordinatorError::EnqueueTimeout {
                    event_type,
                    timeout_ms,
                })
            }
            Err(SendTimeoutError::Closed(_)) => Err(CoordinatorError::ProcessorStopped),
        }
    }

    /// Enqueue a request and wait for the worker's reply.
    ///
    /// Fails fast with `ProcessorStopped` when no worker is running. The wait
    /// for the reply is bounded by the enqueue timeout, which also covers a
    /// worker stopped after the request was queued.
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ProcessorMessage,
    ) -> Result<T, CoordinatorError> {
        if !self.is_running().await {
            return Err(CoordinatorError::ProcessorStopped);
        }

        let (tx, rx) = oneshot::channel();
        let message = build(tx);
        let event_type = message.event_type();
        self.enqueue(message).await?;

        match tokio::time::timeout(self.settings.enqueue_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            // Sender dropped without a reply: the handler panicked
            Ok(Err(e)) => Err(CoordinatorError::Internal(format!(
                "response receive failed: {e}"
            ))),
            Err(_) => {
                let timeout_ms =
                    u64::try_from(self.settings.enqueue_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(
                    target: "coordinator.processor",
                    coordinator_id = %self.coordinator_id,
                    event_type,
                    timeout_ms,
                    "No reply from event processor"
                );
                Err(CoordinatorError::ReplyTimeout {
                    event_type,
                    timeout_ms,
                })
            }
        }
    }

    /// Register a new meeting.
    ///
    /// # Errors
    ///
    /// See [`MeetingCoordinator::handle`].
    pub async fn create_meeting(&self, meeting: Meeting) -> Result<(), CoordinatorError> {
        self.handle(MeetingEvent::CreateMeeting {
            meeting: Box::new(meeting),
        })
        .await
    }

    /// End a meeting on request.
    ///
    /// # Errors
    ///
    /// See [`MeetingCoordinator::handle`].
    pub async fn end_meeting(&self, meeting_id: impl Into<String>) -> Result<(), CoordinatorError> {
        self.handle(MeetingEvent::EndMeeting {
            meeting_id: meeting_id.into(),
        })
        .await
    }

    /// Ask the worker to run one expiration sweep.
    ///
    /// # Errors
    ///
    /// See [`MeetingCoordinator::handle`].
    pub async fn remove_expired_meetings(&self) -> Result<(), CoordinatorError> {
        self.handle(MeetingEvent::RemoveExpiredMeetings).await
    }

    /// Merge custom data for a user of a meeting.
    ///
    /// # Errors
    ///
    /// See [`MeetingCoordinator::handle`].
    pub async fn add_user_custom_data(
        &self,
        meeting_id: impl Into<String>,
        user_id: impl Into<String>,
        data: HashMap<String, String>,
    ) -> Result<(), CoordinatorError> {
        self.handle(MeetingEvent::UserCustomDataAdded {
            meeting_id: meeting_id.into(),
            user_id: user_id.into(),
            data,
        })
        .await
    }

    /// Wait until every message enqueued before this call has been handled.
    ///
    /// # Errors
    ///
    /// `ProcessorStopped` if no worker is running, enqueue errors, or
    /// `ReplyTimeout` if the worker did not get to it in time.
    pub async fn flush(&self) -> Result<(), CoordinatorError> {
        self.request(|respond_to| ProcessorMessage::Flush { respond_to })
            .await
    }

    /// Hand a meeting to the recording ingest pipeline.
    ///
    /// # Errors
    ///
    /// See [`MeetingCoordinator::handle`].
    pub async fn process_recording(
        &self,
        meeting_id: impl Into<String>,
    ) -> Result<(), CoordinatorError> {
        self.enqueue(ProcessorMessage::ProcessRecording {
            meeting_id: meeting_id.into(),
        })
        .await
    }

    // ------------------------------------------------------------------
    // Messaging pass-throughs
    // ------------------------------------------------------------------

    /// Register a webhook subscription and return its ID.
    ///
    /// # Errors
    ///
    /// `ProcessorStopped` if no worker is running, enqueue errors,
    /// `ReplyTimeout`, or `Internal` if the worker dropped the request.
    pub async fn add_subscription(
        &self,
        meeting_id: impl Into<String>,
        event: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Result<String, CoordinatorError> {
        let (meeting_id, event, callback_url) =
            (meeting_id.into(), event.into(), callback_url.into());
        self.request(|respond_to| ProcessorMessage::StoreSubscription {
            meeting_id,
            event,
            callback_url,
            respond_to,
        })
        .await
    }

    /// Remove a webhook subscription. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// `ProcessorStopped` if no worker is running, enqueue errors,
    /// `ReplyTimeout`, or `Internal` if the worker dropped the request.
    pub async fn remove_subscription(
        &self,
        meeting_id: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Result<bool, CoordinatorError> {
        let (meeting_id, subscription_id) = (meeting_id.into(), subscription_id.into());
        self.request(|respond_to| ProcessorMessage::RemoveSubscription {
            meeting_id,
            subscription_id,
            respond_to,
        })
        .await
    }

    /// List webhook subscriptions of a meeting.
    ///
    /// # Errors
    ///
    /// `ProcessorStopped` if no worker is running, enqueue errors,
    /// `ReplyTimeout`, or `Internal` if the worker dropped the request.
    pub async fn list_subscriptions(
        &self,
        meeting_id: impl Into<String>,
    ) -> Result<Vec<HashMap<String, String>>, CoordinatorError> {
        let meeting_id = meeting_id.into();
        self.request(|respond_to| ProcessorMessage::ListSubscriptions {
            meeting_id,
            respond_to,
        })
        .await
    }

    /// Publish a raw message on a channel.
    ///
    /// # Errors
    ///
    /// See [`MeetingCoordinator::handle`].
    pub async fn send(
        &self,
        channel: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), CoordinatorError> {
        self.enqueue(ProcessorMessage::Send {
            channel: channel.into(),
            message: message.into(),
        })
        .await
    }

    /// Broadcast a newly created poll.
    ///
    /// # Errors
    ///
    /// See [`MeetingCoordinator::handle`].
    pub async fn created_polls(
        &self,
        meeting_id: impl Into<String>,
        title: impl Into<String>,
        question: impl Into<String>,
        question_type: impl Into<String>,
        answers: Vec<String>,
    ) -> Result<(), CoordinatorError> {
        self.enqueue(ProcessorMessage::SendPolls {
            meeting_id: meeting_id.into(),
            title: title.into(),
            question: question.into(),
            question_type: question_type.into(),
            answers,
        })
        .await
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Snapshot of a meeting by internal ID or unique prefix.
    #[must_use]
    pub fn get_meeting(&self, meeting_id: &str) -> Option<Meeting> {
        self.meetings.get(meeting_id)
    }

    /// Snapshot of every meeting.
    #[must_use]
    pub fn meetings(&self) -> Vec<Meeting> {
        self.meetings.values()
    }

    #[must_use]
    pub fn is_meeting_with_voice_bridge_exist(&self, voice_bridge: &str) -> bool {
        self.meetings.find_by_voice_bridge(voice_bridge).is_some()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<MeetingRegistry> {
        &self.meetings
    }

    #[must_use]
    pub fn monitor(&self) -> &Arc<QueueMonitor> {
        &self.monitor
    }

    #[must_use]
    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Sessions (not serialized through the queue)
    // ------------------------------------------------------------------

    pub fn add_user_session(&self, token: impl Into<String>, session: UserSession) {
        let token = token.into();
        debug!(
            target: "coordinator.registry",
            meeting_id = %session.meeting_id,
            user_id = %session.internal_user_id,
            "Adding user session"
        );
        self.sessions.put(token, session);
    }

    #[must_use]
    pub fn get_user_session(&self, token: &str) -> Option<UserSession> {
        self.sessions.get(token)
    }

    pub fn remove_user_session(&self, token: &str) -> Option<UserSession> {
        self.sessions.remove(token)
    }

    // ------------------------------------------------------------------
    // Recording queries (direct to the recording gateway)
    // ------------------------------------------------------------------

    /// Recordings of the given meetings, one entry per recording ID.
    #[must_use]
    pub fn get_recordings(&self, meeting_ids: &[String]) -> HashMap<String, Recording> {
        reorder_recordings(self.recordings.get_recordings(meeting_ids))
    }

    #[must_use]
    pub fn exists_any_recording(&self, meeting_ids: &[String]) -> bool {
        self.recordings.exists_any_recording(meeting_ids)
    }

    pub fn set_publish_recording(&self, recording_ids: &[String], publish: bool) {
        for recording_id in recording_ids {
            self.recordings.publish(recording_id, publish);
        }
    }

    pub fn delete_recordings(&self, recording_ids: &[String]) {
        for recording_id in recording_ids {
            self.recordings.delete(recording_id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::gateway::{TracingMessagingGateway, TracingRecordingGateway};
    use std::time::Duration;

    fn coordinator(settings: CoordinatorSettings) -> MeetingCoordinator {
        MeetingCoordinator::new(
            "coord-test",
            settings,
            Arc::new(TracingMessagingGateway),
            Arc::new(TracingRecordingGateway),
        )
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let c = coordinator(CoordinatorSettings::default());
        c.start().await.unwrap();
        assert!(matches!(c.start().await, Err(CoordinatorError::AlreadyRunning)));
        assert!(c.is_running().await);
        c.stop().await.unwrap();
        assert!(!c.is_running().await);
        // stop on a stopped coordinator is a no-op
        c.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_events_queued_while_stopped_apply_after_start() {
        let c = coordinator(CoordinatorSettings::default());
        c.create_meeting(Meeting::builder("m-1", "ext-1", "Standup").build())
            .await
            .unwrap();
        assert!(c.get_meeting("m-1").is_none());

        c.start().await.unwrap();
        c.flush().await.unwrap();
        assert!(c.get_meeting("m-1").is_some());
        c.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_enqueue_times_out_when_full() {
        let settings = CoordinatorSettings {
            queue_capacity: 1,
            enqueue_timeout: Duration::from_millis(20),
            ..CoordinatorSettings::default()
        };
        let c = coordinator(settings);

        c.remove_expired_meetings().await.unwrap();
        let err = c.end_meeting("m-1").await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::EnqueueTimeout {
                event_type: "end_meeting",
                timeout_ms: 20
            }
        ));
        assert_eq!(c.monitor().messages_dropped(), 1);
    }

    #[tokio::test]
    async fn test_requests_fail_fast_while_stopped() {
        let c = coordinator(CoordinatorSettings::default());

        let flushed = tokio::time::timeout(Duration::from_secs(1), c.flush())
            .await
            .expect("flush should not wait on a stopped worker");
        assert!(matches!(flushed, Err(CoordinatorError::ProcessorStopped)));

        let listed = tokio::time::timeout(Duration::from_secs(1), c.list_subscriptions("m-1"))
            .await
            .expect("list_subscriptions should not wait on a stopped worker");
        assert!(matches!(listed, Err(CoordinatorError::ProcessorStopped)));

        // Nothing was queued, so a later start has nothing stale to answer
        assert_eq!(c.monitor().messages_dropped(), 0);
        c.start().await.unwrap();
        c.flush().await.unwrap();
        c.stop().await.unwrap();

        let after_stop = c.add_subscription("m-1", "meeting-ended", "https://hooks/x").await;
        assert!(matches!(after_stop, Err(CoordinatorError::ProcessorStopped)));
    }

    #[tokio::test]
    async fn test_subscription_round_trip_through_worker() {
        let c = coordinator(CoordinatorSettings::default());
        c.start().await.unwrap();

        let sid = c
            .add_subscription("m-1", "meeting-ended", "https://hooks/x")
            .await
            .unwrap();
        assert!(!sid.is_empty());
        assert!(!c.remove_subscription("m-1", sid).await.unwrap());
        assert!(c.list_subscriptions("m-1").await.unwrap().is_empty());

        c.stop().await.unwrap();
    }

    #[test]
    fn test_sessions_are_direct() {
        let c = coordinator(CoordinatorSettings::default());
        let token = UserSession::generate_token();
        c.add_user_session(
            token.clone(),
            UserSession::new(token.clone(), "m-1", "u-1", "Alice", "VIEWER"),
        );
        assert_eq!(c.get_user_session(&token).unwrap().full_name, "Alice");
        assert!(c.remove_user_session(&token).is_some());
        assert!(c.get_user_session(&token).is_none());
    }
}
