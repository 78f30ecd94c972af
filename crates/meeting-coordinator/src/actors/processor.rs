//! `EventProcessor` - the single worker that applies meeting mutations.
//!
//! Exactly one processor drains the intake queue at a time. Every write to the
//! meeting registry and every lifecycle call to the gateways happens here, so
//! events are applied in dequeue order with no locking between handlers.
//!
//! Handlers are synchronous. Each message is dispatched inside
//! `catch_unwind`: a panicking handler (usually a misbehaving gateway) is
//! logged and counted, and the loop moves on to the next message.

use crate::config::CoordinatorSettings;
use crate::domain::{now_millis, Meeting, User};
use crate::errors::CoordinatorError;
use crate::gateway::{MessagingGateway, RecordingGateway};
use crate::observability::metrics;
use crate::recording::{METADATA_MEETING_ID, METADATA_MEETING_NAME};
use crate::registry::MeetingRegistry;

use super::messages::{MeetingEvent, ProcessorMessage};
use super::metrics::QueueMonitor;

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Removal reasons reported on `coordinator_meetings_removed_total`.
const REMOVED_EXPIRED: &str = "expired";
const REMOVED_NEVER_STARTED: &str = "never_started";
const REMOVED_ENDED_ON_REQUEST: &str = "ended_on_request";

/// The worker half of the coordinator.
pub(crate) struct EventProcessor {
    coordinator_id: String,
    receiver: mpsc::Receiver<ProcessorMessage>,
    cancel_token: CancellationToken,
    meetings: Arc<MeetingRegistry>,
    messaging: Arc<dyn MessagingGateway>,
    recordings: Arc<dyn RecordingGateway>,
    settings: CoordinatorSettings,
    monitor: Arc<QueueMonitor>,
}

impl EventProcessor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        coordinator_id: String,
        receiver: mpsc::Receiver<ProcessorMessage>,
        cancel_token: CancellationToken,
        meetings: Arc<MeetingRegistry>,
        messaging: Arc<dyn MessagingGateway>,
        recordings: Arc<dyn RecordingGateway>,
        settings: CoordinatorSettings,
        monitor: Arc<QueueMonitor>,
    ) -> Self {
        Self {
            coordinator_id,
            receiver,
            cancel_token,
            meetings,
            messaging,
            recordings,
            settings,
            monitor,
        }
    }

    /// Run the message loop until cancelled or every sender is gone.
    ///
    /// Returns the receiver so a later `start()` can resume the same queue.
    /// Messages still queued at cancellation stay in the channel.
    #[instrument(skip_all, name = "coordinator.processor", fields(coordinator_id = %self.coordinator_id))]
    pub(crate) async fn run(mut self) -> mpsc::Receiver<ProcessorMessage> {
        info!(
            target: "coordinator.processor",
            coordinator_id = %self.coordinator_id,
            "Event processor started"
        );

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "coordinator.processor",
                        coordinator_id = %self.coordinator_id,
                        pending = self.receiver.len(),
                        "Event processor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.monitor.observe_depth(self.receiver.len());
                            self.dispatch(message);
                        }
                        None => {
                            info!(
                                target: "coordinator.processor",
                                coordinator_id = %self.coordinator_id,
                                "Event processor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "coordinator.processor",
            coordinator_id = %self.coordinator_id,
            messages_processed = self.monitor.messages_processed(),
            handler_panics = self.monitor.handler_panics(),
            "Event processor stopped"
        );

        self.receiver
    }

    /// Handle one message, containing any panic raised while doing so.
    fn dispatch(&self, message: ProcessorMessage) {
        let event_type = message.event_type();
        let started = Instant::now();

        match catch_unwind(AssertUnwindSafe(|| self.handle_message(message))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_not_found() => {
                warn!(
                    target: "coordinator.processor",
                    event_type,
                    error = %e,
                    "Event skipped"
                );
            }
            Ok(Err(e)) => {
                error!(
                    target: "coordinator.processor",
                    event_type,
                    error = %e,
                    "Event handler failed"
                );
            }
            Err(payload) => {
                self.monitor.record_panic();
                metrics::record_handler_panic(event_type);
                error!(
                    target: "coordinator.processor",
                    event_type,
                    panic = %panic_message(payload.as_ref()),
                    "Event handler panicked"
                );
            }
        }

        self.monitor.record_processed();
        metrics::record_event_processed(event_type, started.elapsed());
    }

    fn handle_message(&self, message: ProcessorMessage) -> Result<(), CoordinatorError> {
        match message {
            ProcessorMessage::Event(event) => self.handle_event(event),

            ProcessorMessage::Flush { respond_to } => {
                let _ = respond_to.send(());
                Ok(())
            }

            ProcessorMessage::ProcessRecording { meeting_id } => {
                self.process_recording(&meeting_id);
                Ok(())
            }

            ProcessorMessage::StoreSubscription {
                meeting_id,
                event,
                callback_url,
                respond_to,
            } => {
                let subscription_id =
                    self.messaging
                        .store_subscription(&meeting_id, &event, &callback_url);
                let _ = respond_to.send(subscription_id);
                Ok(())
            }

            ProcessorMessage::RemoveSubscription {
                meeting_id,
                subscription_id,
                respond_to,
            } => {
                let removed = self
                    .messaging
                    .remove_subscription(&meeting_id, &subscription_id);
                let _ = respond_to.send(removed);
                Ok(())
            }

            ProcessorMessage::ListSubscriptions {
                meeting_id,
                respond_to,
            } => {
                let subscriptions = self.messaging.list_subscriptions(&meeting_id);
                let _ = respond_to.send(subscriptions);
                Ok(())
            }

            ProcessorMessage::Send { channel, message } => {
                self.messaging.send(&channel, &message);
                Ok(())
            }

            ProcessorMessage::SendPolls {
                meeting_id,
                title,
                question,
                question_type,
                answers,
            } => {
                self.messaging
                    .send_polls(&meeting_id, &title, &question, &question_type, &answers);
                Ok(())
            }
        }
    }

    fn handle_event(&self, event: MeetingEvent) -> Result<(), CoordinatorError> {
        match event {
            MeetingEvent::CreateMeeting { meeting } => {
                self.create_meeting(*meeting);
                Ok(())
            }
            MeetingEvent::EndMeeting { meeting_id } => self.end_meeting(&meeting_id),
            MeetingEvent::MeetingStarted { meeting_id } => self.meeting_started(&meeting_id),
            MeetingEvent::MeetingEnded { meeting_id } => self.meeting_ended(&meeting_id),
            MeetingEvent::MeetingDestroyed { meeting_id } => {
                debug!(
                    target: "coordinator.processor",
                    meeting_id = %meeting_id,
                    "Meeting destroyed notification"
                );
                Ok(())
            }
            MeetingEvent::UserJoined {
                meeting_id,
                user_id,
                external_user_id,
                name,
                role,
            } => self.user_joined(&meeting_id, User::new(user_id, external_user_id, name, role)),
            MeetingEvent::UserLeft {
                meeting_id,
                user_id,
            } => self.user_left(&meeting_id, &user_id),
            MeetingEvent::UserStatusChanged {
                meeting_id,
                user_id,
                status,
                value,
            } => self.user_status_changed(&meeting_id, &user_id, status, value),
            MeetingEvent::UserCustomDataAdded {
                meeting_id,
                user_id,
                data,
            } => self.user_custom_data_added(&meeting_id, &user_id, data),
            MeetingEvent::RemoveExpiredMeetings => {
                self.remove_expired_meetings();
                Ok(())
            }
        }
    }

    fn create_meeting(&self, meeting: Meeting) {
        let internal_id = meeting.internal_id().to_string();
        let name = meeting.name().to_string();
        let voice_bridge = meeting.voice_bridge().to_string();
        let record = meeting.is_record();
        let duration = meeting.duration();

        let mut recording_info = None;
        if record {
            let mut info = meeting.metadata().clone();
            info.insert(
                METADATA_MEETING_ID.to_string(),
                meeting.external_id().to_string(),
            );
            info.insert(METADATA_MEETING_NAME.to_string(), name.clone());
            recording_info = Some(info);
        }

        if self.meetings.put(meeting).is_some() {
            warn!(
                target: "coordinator.processor",
                meeting_id = %internal_id,
                "Replaced existing meeting with the same internal id"
            );
        }

        info!(
            target: "coordinator.processor",
            meeting_id = %internal_id,
            name = %name,
            record,
            "Meeting created"
        );

        if let Some(info) = recording_info {
            self.messaging.record_meeting_info(&internal_id, &info);
        }
        self.messaging
            .create_meeting(&internal_id, &name, record, &voice_bridge, duration);
    }

    /// End a meeting on request. Also the exceeded-duration path of the sweep.
    fn end_meeting(&self, meeting_id: &str) -> Result<(), CoordinatorError> {
        self.messaging.end_meeting(meeting_id);

        let meeting = self
            .meetings
            .update(meeting_id, |m| {
                m.set_forcibly_ended(true);
                m.clone()
            })
            .ok_or_else(|| CoordinatorError::MeetingNotFound(meeting_id.to_string()))?;

        info!(
            target: "coordinator.processor",
            meeting_id = %meeting.internal_id(),
            "Meeting forcibly ended"
        );

        if self.settings.remove_meeting_on_end {
            if meeting.is_record() {
                self.process_recording(meeting.internal_id());
            }
            self.messaging.destroy_meeting(meeting.internal_id());
            if self.meetings.remove(meeting.internal_id()).is_some() {
                metrics::record_meeting_removed(REMOVED_ENDED_ON_REQUEST);
                info!(
                    target: "coordinator.processor",
                    meeting_id = %meeting.internal_id(),
                    "Ended meeting removed"
                );
            }
        }

        Ok(())
    }

    fn meeting_started(&self, meeting_id: &str) -> Result<(), CoordinatorError> {
        let now = now_millis();
        let first_start = self
            .meetings
            .update(meeting_id, |m| {
                let first_start = !m.has_started();
                if first_start {
                    m.set_start_time(now);
                }
                m.set_end_time(0);
                first_start
            })
            .ok_or_else(|| CoordinatorError::MeetingNotFound(meeting_id.to_string()))?;

        if first_start {
            info!(
                target: "coordinator.processor",
                meeting_id = %meeting_id,
                start_time = now,
                "Meeting started"
            );
        } else {
            debug!(
                target: "coordinator.processor",
                meeting_id = %meeting_id,
                "Meeting started again"
            );
        }
        Ok(())
    }

    fn meeting_ended(&self, meeting_id: &str) -> Result<(), CoordinatorError> {
        let now = now_millis();
        self.meetings
            .update(meeting_id, |m| m.set_end_time(now))
            .ok_or_else(|| CoordinatorError::MeetingNotFound(meeting_id.to_string()))?;

        debug!(
            target: "coordinator.processor",
            meeting_id = %meeting_id,
            end_time = now,
            "Meeting ended"
        );
        Ok(())
    }

    fn user_joined(&self, meeting_id: &str, user: User) -> Result<(), CoordinatorError> {
        let user_id = user.internal_user_id.clone();
        let num_users = self
            .meetings
            .update(meeting_id, |m| {
                m.user_joined(user);
                m.num_users()
            })
            .ok_or_else(|| CoordinatorError::MeetingNotFound(meeting_id.to_string()))?;

        debug!(
            target: "coordinator.processor",
            meeting_id = %meeting_id,
            user_id = %user_id,
            num_users,
            "User joined"
        );
        Ok(())
    }

    fn user_left(&self, meeting_id: &str, user_id: &str) -> Result<(), CoordinatorError> {
        let removed = self
            .meetings
            .update(meeting_id, |m| m.user_left(user_id))
            .ok_or_else(|| CoordinatorError::MeetingNotFound(meeting_id.to_string()))?;

        match removed {
            Some(user) => {
                debug!(
                    target: "coordinator.processor",
                    meeting_id = %meeting_id,
                    user_id = %user_id,
                    full_name = %user.full_name,
                    "User left"
                );
                Ok(())
            }
            None => Err(CoordinatorError::UserNotFound {
                meeting_id: meeting_id.to_string(),
                user_id: user_id.to_string(),
            }),
        }
    }

    fn user_status_changed(
        &self,
        meeting_id: &str,
        user_id: &str,
        status: String,
        value: String,
    ) -> Result<(), CoordinatorError> {
        let updated = self
            .meetings
            .update(meeting_id, |m| match m.user_by_id_mut(user_id) {
                Some(user) => {
                    user.set_status(status, value);
                    true
                }
                None => false,
            })
            .ok_or_else(|| CoordinatorError::MeetingNotFound(meeting_id.to_string()))?;

        if !updated {
            return Err(CoordinatorError::UserNotFound {
                meeting_id: meeting_id.to_string(),
                user_id: user_id.to_string(),
            });
        }

        debug!(
            target: "coordinator.processor",
            meeting_id = %meeting_id,
            user_id = %user_id,
            "User status changed"
        );
        Ok(())
    }

    fn user_custom_data_added(
        &self,
        meeting_id: &str,
        user_id: &str,
        data: HashMap<String, String>,
    ) -> Result<(), CoordinatorError> {
        let entries = data.len();
        self.meetings
            .update(meeting_id, |m| m.add_user_custom_data(user_id, data))
            .ok_or_else(|| CoordinatorError::MeetingNotFound(meeting_id.to_string()))?;

        debug!(
            target: "coordinator.processor",
            meeting_id = %meeting_id,
            user_id = %user_id,
            entries,
            "User custom data added"
        );
        Ok(())
    }

    /// Apply the expiration rules to a snapshot of every meeting.
    ///
    /// Per meeting, in order: expired (ingest if recorded and empty, destroy,
    /// remove), forcibly ended (destroy only), never started (destroy,
    /// remove), exceeded duration (end on request).
    fn remove_expired_meetings(&self) {
        let now = now_millis();
        let snapshot = self.meetings.values();

        debug!(
            target: "coordinator.sweeper",
            meetings = snapshot.len(),
            "Checking meetings for expiration"
        );

        for meeting in snapshot {
            let meeting_id = meeting.internal_id();

            if meeting.has_expired(self.settings.meeting_expire_minutes, now) {
                info!(
                    target: "coordinator.sweeper",
                    meeting_id = %meeting_id,
                    name = %meeting.name(),
                    start_time = meeting.start_time(),
                    end_time = meeting.end_time(),
                    "Removing expired meeting"
                );
                if meeting.is_record() && meeting.num_users() == 0 {
                    self.process_recording(meeting_id);
                }
                self.messaging.destroy_meeting(meeting_id);
                if self.meetings.remove(meeting_id).is_some() {
                    metrics::record_meeting_removed(REMOVED_EXPIRED);
                }
                continue;
            }

            if meeting.is_forcibly_ended() {
                info!(
                    target: "coordinator.sweeper",
                    meeting_id = %meeting_id,
                    "Destroying forcibly ended meeting"
                );
                self.messaging.destroy_meeting(meeting_id);
            }

            if meeting.was_never_started(self.settings.create_join_minutes, now) {
                info!(
                    target: "coordinator.sweeper",
                    meeting_id = %meeting_id,
                    name = %meeting.name(),
                    "Removing meeting that was never joined"
                );
                self.messaging.destroy_meeting(meeting_id);
                if self.meetings.remove(meeting_id).is_some() {
                    metrics::record_meeting_removed(REMOVED_NEVER_STARTED);
                }
                continue;
            }

            if meeting.has_exceeded_duration(now) {
                info!(
                    target: "coordinator.sweeper",
                    meeting_id = %meeting_id,
                    duration_minutes = meeting.duration(),
                    "Meeting exceeded its duration, ending"
                );
                // Applied inline; re-enqueueing from the worker could block on a full queue
                if let Err(e) = self.end_meeting(meeting_id) {
                    warn!(
                        target: "coordinator.sweeper",
                        meeting_id = %meeting_id,
                        error = %e,
                        "Failed to end meeting"
                    );
                }
            }
        }
    }

    fn process_recording(&self, meeting_id: &str) {
        debug!(
            target: "coordinator.recording",
            meeting_id = %meeting_id,
            "Handing meeting to recording ingest"
        );
        self.recordings.start_ingest_and_processing(meeting_id);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
