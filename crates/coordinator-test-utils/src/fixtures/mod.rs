//! Pre-configured test data fixtures for coordinator testing.
//!
//! Provides builders and test data for:
//! - Meetings at any point of their lifecycle (backdated timestamps)
//! - Roster events for users with different roles
//! - Raw recording rows as the recording store returns them

use chrono::Utc;
use meeting_coordinator::domain::user::{ROLE_MODERATOR, ROLE_VIEWER};
use meeting_coordinator::domain::Meeting;
use meeting_coordinator::recording::{Recording, METADATA_MEETING_ID, METADATA_MEETING_NAME};
use meeting_coordinator::MeetingEvent;

const MINUTE_MS: i64 = 60_000;

/// Test meeting fixture.
#[derive(Debug, Clone)]
pub struct TestMeeting {
    /// Internal meeting ID.
    pub id: String,
    pub external_id: String,
    pub name: String,
    pub voice_bridge: String,
    pub record: bool,
    /// Maximum duration in minutes.
    pub duration: u64,
    pub created_time: i64,
    pub start_time: i64,
    pub end_time: i64,
    pub metadata: Vec<(String, String)>,
}

impl TestMeeting {
    /// Create a fresh, not yet started meeting with the given internal ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            external_id: format!("ext-{id}"),
            id,
            name: "Test Meeting".to_string(),
            voice_bridge: "70000".to_string(),
            record: false,
            duration: 0,
            created_time: now(),
            start_time: 0,
            end_time: 0,
            metadata: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_voice_bridge(mut self, voice_bridge: impl Into<String>) -> Self {
        self.voice_bridge = voice_bridge.into();
        self
    }

    #[must_use]
    pub fn recorded(mut self) -> Self {
        self.record = true;
        self
    }

    #[must_use]
    pub fn with_duration(mut self, minutes: u64) -> Self {
        self.duration = minutes;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Backdate creation.
    #[must_use]
    pub fn created_minutes_ago(mut self, minutes: i64) -> Self {
        self.created_time = now() - minutes * MINUTE_MS;
        self
    }

    /// Mark as started `minutes` ago (and created just before).
    #[must_use]
    pub fn started_minutes_ago(mut self, minutes: i64) -> Self {
        self.start_time = now() - minutes * MINUTE_MS;
        self.created_time = self.created_time.min(self.start_time);
        self
    }

    /// Mark as ended `minutes` ago. Also marks it started if it was not.
    #[must_use]
    pub fn ended_minutes_ago(mut self, minutes: i64) -> Self {
        self.end_time = now() - minutes * MINUTE_MS;
        if self.start_time == 0 {
            self.start_time = self.end_time - MINUTE_MS;
        }
        self.created_time = self.created_time.min(self.start_time);
        self
    }

    /// Build the domain meeting.
    #[must_use]
    pub fn build(&self) -> Meeting {
        let mut builder = Meeting::builder(&self.id, &self.external_id, &self.name)
            .voice_bridge(&self.voice_bridge)
            .record(self.record)
            .duration(self.duration)
            .created_time(self.created_time)
            .start_time(self.start_time)
            .end_time(self.end_time);
        for (key, value) in &self.metadata {
            builder = builder.metadata(key, value);
        }
        builder.build()
    }
}

/// `UserJoined` event for a moderator.
#[must_use]
pub fn moderator_joined(meeting_id: &str, user_id: &str, name: &str) -> MeetingEvent {
    user_joined(meeting_id, user_id, name, ROLE_MODERATOR)
}

/// `UserJoined` event for a viewer.
#[must_use]
pub fn viewer_joined(meeting_id: &str, user_id: &str, name: &str) -> MeetingEvent {
    user_joined(meeting_id, user_id, name, ROLE_VIEWER)
}

fn user_joined(meeting_id: &str, user_id: &str, name: &str, role: &str) -> MeetingEvent {
    MeetingEvent::UserJoined {
        meeting_id: meeting_id.to_string(),
        user_id: user_id.to_string(),
        external_user_id: format!("ext-{user_id}"),
        name: name.to_string(),
        role: role.to_string(),
    }
}

/// One raw recording row: 90 s long, annotated with meeting ID and name.
#[must_use]
pub fn test_recording(id: &str, format: &str) -> Recording {
    let mut recording = Recording {
        id: id.to_string(),
        start_time: "1700000000000".to_string(),
        end_time: "1700000090000".to_string(),
        playback_format: format.to_string(),
        playback_link: format!("https://play.example/{id}/{format}"),
        ..Recording::default()
    };
    recording
        .metadata
        .insert(METADATA_MEETING_ID.to_string(), format!("ext-{id}"));
    recording
        .metadata
        .insert(METADATA_MEETING_NAME.to_string(), "Test Meeting".to_string());
    recording
}

fn now() -> i64 {
    Utc::now().timestamp_millis()
}
