//! `Meeting` - lifecycle state of one meeting.
//!
//! A `Meeting` lives in the `MeetingRegistry` and is mutated only by the
//! event processor worker. Readers receive cloned snapshots.
//!
//! # Timing
//!
//! ```text
//! created_time ──► start_time ──► end_time ──► (expire window) ──► swept
//!      │                             ▲
//!      └── never started within      └── reset to 0 on restart
//!          create/join window ──► swept
//! ```

use super::minutes_to_millis;
use super::user::User;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state of one meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    internal_id: String,
    external_id: String,
    name: String,
    voice_bridge: String,
    web_voice: String,
    dial_number: String,
    welcome_message: String,
    logout_url: String,
    max_users: u32,
    /// Maximum running time in minutes, 0 for unlimited.
    duration: u64,
    record: bool,
    created_time: i64,
    start_time: i64,
    end_time: i64,
    forcibly_ended: bool,
    metadata: HashMap<String, String>,
    users: HashMap<String, User>,
    user_custom_data: HashMap<String, HashMap<String, String>>,
}

impl Meeting {
    /// Start building a meeting with its identity.
    #[must_use]
    pub fn builder(
        internal_id: impl Into<String>,
        external_id: impl Into<String>,
        name: impl Into<String>,
    ) -> MeetingBuilder {
        MeetingBuilder::new(internal_id.into(), external_id.into(), name.into())
    }

    #[must_use]
    pub fn internal_id(&self) -> &str {
        &self.internal_id
    }

    #[must_use]
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn voice_bridge(&self) -> &str {
        &self.voice_bridge
    }

    #[must_use]
    pub fn web_voice(&self) -> &str {
        &self.web_voice
    }

    #[must_use]
    pub fn dial_number(&self) -> &str {
        &self.dial_number
    }

    #[must_use]
    pub fn welcome_message(&self) -> &str {
        &self.welcome_message
    }

    #[must_use]
    pub fn logout_url(&self) -> &str {
        &self.logout_url
    }

    #[must_use]
    pub fn max_users(&self) -> u32 {
        self.max_users
    }

    /// Maximum running time in minutes (0 = unlimited).
    #[must_use]
    pub fn duration(&self) -> u64 {
        self.duration
    }

    #[must_use]
    pub fn is_record(&self) -> bool {
        self.record
    }

    #[must_use]
    pub fn created_time(&self) -> i64 {
        self.created_time
    }

    #[must_use]
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    #[must_use]
    pub fn is_forcibly_ended(&self) -> bool {
        self.forcibly_ended
    }

    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn set_start_time(&mut self, start_time: i64) {
        self.start_time = start_time;
    }

    pub fn set_end_time(&mut self, end_time: i64) {
        self.end_time = end_time;
    }

    pub fn set_forcibly_ended(&mut self, forcibly_ended: bool) {
        self.forcibly_ended = forcibly_ended;
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    /// Add a user to the roster, replacing any user with the same ID.
    pub fn user_joined(&mut self, user: User) {
        self.users.insert(user.internal_user_id.clone(), user);
    }

    /// Remove a user from the roster, returning it if it was present.
    pub fn user_left(&mut self, user_id: &str) -> Option<User> {
        self.users.remove(user_id)
    }

    #[must_use]
    pub fn user_by_id(&self, user_id: &str) -> Option<&User> {
        self.users.get(user_id)
    }

    pub fn user_by_id_mut(&mut self, user_id: &str) -> Option<&mut User> {
        self.users.get_mut(user_id)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    #[must_use]
    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn num_moderators(&self) -> usize {
        self.users.values().filter(|u| u.is_moderator()).count()
    }

    /// Merge custom data for a user ID. The user does not need to have joined.
    pub fn add_user_custom_data(&mut self, user_id: &str, data: HashMap<String, String>) {
        self.user_custom_data
            .entry(user_id.to_string())
            .or_default()
            .extend(data);
    }

    #[must_use]
    pub fn user_custom_data(&self, user_id: &str) -> Option<&HashMap<String, String>> {
        self.user_custom_data.get(user_id)
    }

    // ------------------------------------------------------------------
    // Lifecycle predicates
    // ------------------------------------------------------------------

    #[must_use]
    pub fn has_started(&self) -> bool {
        self.start_time != 0
    }

    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.end_time != 0
    }

    /// Ended more than `expire_minutes` ago.
    #[must_use]
    pub fn has_expired(&self, expire_minutes: u64, now: i64) -> bool {
        self.has_ended()
            && now.saturating_sub(self.end_time) > minutes_to_millis(expire_minutes)
    }

    /// Never started, and created more than `create_join_minutes` ago.
    #[must_use]
    pub fn was_never_started(&self, create_join_minutes: u64, now: i64) -> bool {
        !self.has_started()
            && now.saturating_sub(self.created_time) > minutes_to_millis(create_join_minutes)
    }

    /// Still running past its configured maximum duration.
    #[must_use]
    pub fn has_exceeded_duration(&self, now: i64) -> bool {
        self.duration > 0
            && self.has_started()
            && !self.has_ended()
            && now.saturating_sub(self.start_time) > minutes_to_millis(self.duration)
    }
}

/// Builder for [`Meeting`].
#[derive(Debug, Clone)]
pub struct MeetingBuilder {
    meeting: Meeting,
}

impl MeetingBuilder {
    fn new(internal_id: String, external_id: String, name: String) -> Self {
        Self {
            meeting: Meeting {
                internal_id,
                external_id,
                name,
                voice_bridge: String::new(),
                web_voice: String::new(),
                dial_number: String::new(),
                welcome_message: String::new(),
                logout_url: String::new(),
                max_users: 0,
                duration: 0,
                record: false,
                created_time: super::now_millis(),
                start_time: 0,
                end_time: 0,
                forcibly_ended: false,
                metadata: HashMap::new(),
                users: HashMap::new(),
                user_custom_data: HashMap::new(),
            },
        }
    }

    #[must_use]
    pub fn voice_bridge(mut self, voice_bridge: impl Into<String>) -> Self {
        self.meeting.voice_bridge = voice_bridge.into();
        self
    }

    #[must_use]
    pub fn web_voice(mut self, web_voice: impl Into<String>) -> Self {
        self.meeting.web_voice = web_voice.into();
        self
    }

    #[must_use]
    pub fn dial_number(mut self, dial_number: impl Into<String>) -> Self {
        self.meeting.dial_number = dial_number.into();
        self
    }

    #[must_use]
    pub fn welcome_message(mut self, welcome_message: impl Into<String>) -> Self {
        self.meeting.welcome_message = welcome_message.into();
        self
    }

    #[must_use]
    pub fn logout_url(mut self, logout_url: impl Into<String>) -> Self {
        self.meeting.logout_url = logout_url.into();
        self
    }

    #[must_use]
    pub fn max_users(mut self, max_users: u32) -> Self {
        self.meeting.max_users = max_users;
        self
    }

    /// Maximum running time in minutes (0 = unlimited).
    #[must_use]
    pub fn duration(mut self, minutes: u64) -> Self {
        self.meeting.duration = minutes;
        self
    }

    #[must_use]
    pub fn record(mut self, record: bool) -> Self {
        self.meeting.record = record;
        self
    }

    /// Override the creation time (defaults to now).
    #[must_use]
    pub fn created_time(mut self, created_time: i64) -> Self {
        self.meeting.created_time = created_time;
        self
    }

    /// Build an already-started meeting (e.g. from a snapshot).
    #[must_use]
    pub fn start_time(mut self, start_time: i64) -> Self {
        self.meeting.start_time = start_time;
        self
    }

    #[must_use]
    pub fn end_time(mut self, end_time: i64) -> Self {
        self.meeting.end_time = end_time;
        self
    }

    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meeting.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Meeting {
        self.meeting
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::user::ROLE_MODERATOR;

    const MINUTE: i64 = 60_000;

    fn meeting_created_at(created: i64) -> Meeting {
        Meeting::builder("int-1", "ext-1", "Weekly")
            .created_time(created)
            .build()
    }

    #[test]
    fn test_builder_defaults() {
        let before = crate::domain::now_millis();
        let meeting = Meeting::builder("int-1", "ext-1", "Weekly")
            .voice_bridge("70001")
            .record(true)
            .duration(30)
            .metadata("course", "cs101")
            .build();

        assert_eq!(meeting.internal_id(), "int-1");
        assert_eq!(meeting.external_id(), "ext-1");
        assert_eq!(meeting.voice_bridge(), "70001");
        assert!(meeting.is_record());
        assert_eq!(meeting.duration(), 30);
        assert_eq!(meeting.start_time(), 0);
        assert_eq!(meeting.end_time(), 0);
        assert!(!meeting.is_forcibly_ended());
        assert!(meeting.created_time() >= before);
        assert_eq!(meeting.metadata().get("course").map(String::as_str), Some("cs101"));
    }

    #[test]
    fn test_roster_join_and_leave() {
        let mut meeting = meeting_created_at(0);
        meeting.user_joined(User::new("u-1", "e-1", "Alice", ROLE_MODERATOR));
        meeting.user_joined(User::new("u-2", "e-2", "Bob", "VIEWER"));

        assert_eq!(meeting.num_users(), 2);
        assert_eq!(meeting.num_moderators(), 1);

        let left = meeting.user_left("u-2");
        assert_eq!(left.map(|u| u.full_name), Some("Bob".to_string()));
        assert_eq!(meeting.num_users(), 1);

        assert!(meeting.user_left("u-404").is_none());
        assert_eq!(meeting.num_users(), 1);
    }

    #[test]
    fn test_custom_data_merges() {
        let mut meeting = meeting_created_at(0);
        meeting.add_user_custom_data("u-1", HashMap::from([("a".into(), "1".into())]));
        meeting.add_user_custom_data("u-1", HashMap::from([("b".into(), "2".into())]));

        let data = meeting.user_custom_data("u-1").unwrap();
        assert_eq!(data.len(), 2);
        assert!(meeting.user_custom_data("u-2").is_none());
    }

    #[test]
    fn test_has_expired_measured_from_end_time() {
        let now = 100 * MINUTE;
        let mut meeting = meeting_created_at(0);
        meeting.set_start_time(10 * MINUTE);

        // Running meetings never expire
        assert!(!meeting.has_expired(1, now));

        meeting.set_end_time(now - MINUTE / 2);
        assert!(!meeting.has_expired(1, now));

        meeting.set_end_time(now - 2 * MINUTE);
        assert!(meeting.has_expired(1, now));
    }

    #[test]
    fn test_was_never_started() {
        let now = 100 * MINUTE;
        let mut meeting = meeting_created_at(now - 6 * MINUTE);
        assert!(meeting.was_never_started(5, now));
        assert!(!meeting.was_never_started(10, now));

        meeting.set_start_time(now - MINUTE);
        assert!(!meeting.was_never_started(5, now));
    }

    #[test]
    fn test_has_exceeded_duration() {
        let now = 100 * MINUTE;
        let mut meeting = Meeting::builder("int-1", "ext-1", "Timed")
            .duration(30)
            .created_time(0)
            .build();

        // Not started
        assert!(!meeting.has_exceeded_duration(now));

        meeting.set_start_time(now - 31 * MINUTE);
        assert!(meeting.has_exceeded_duration(now));

        // Already ended
        meeting.set_end_time(now - MINUTE);
        assert!(!meeting.has_exceeded_duration(now));

        // Unlimited
        let mut unlimited = meeting_created_at(0);
        unlimited.set_start_time(1);
        assert!(!unlimited.has_exceeded_duration(now));
    }
}
