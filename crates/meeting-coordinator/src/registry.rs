//! Entity registries for active meetings and user sessions.
//!
//! Both registries are backed by `DashMap`, so any task may read them without
//! external locking:
//!
//! - `MeetingRegistry` is read from anywhere but written only by the event
//!   processor worker (its mutators are crate-private).
//! - `SessionRegistry` is read and written directly by request tasks; session
//!   tokens carry no cross-entity invariant and bypass the event queue.
//!
//! Readers always receive cloned snapshots, never live references, so a sweep
//! can mutate the map while another task iterates an earlier snapshot.

use crate::domain::{Meeting, UserSession};
use crate::observability::metrics;
use dashmap::DashMap;
use tracing::debug;

/// Active meetings keyed by internal ID.
#[derive(Debug, Default)]
pub struct MeetingRegistry {
    meetings: DashMap<String, Meeting>,
}

impl MeetingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a meeting by internal ID, falling back to a unique prefix match.
    ///
    /// External callers sometimes hold a truncated ID. When no key matches
    /// exactly, the single key starting with `id` is used. An ambiguous prefix
    /// (two or more candidates) or an empty `id` returns `None`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Meeting> {
        let key = self.resolve_key(id)?;
        self.meetings.get(&key).map(|entry| entry.value().clone())
    }

    /// Resolve an ID or unique prefix to the stored key.
    #[must_use]
    pub fn resolve_key(&self, id: &str) -> Option<String> {
        if id.is_empty() {
            return None;
        }
        if self.meetings.contains_key(id) {
            return Some(id.to_string());
        }

        let mut candidates = self
            .meetings
            .iter()
            .filter(|entry| entry.key().starts_with(id))
            .map(|entry| entry.key().clone());

        let first = candidates.next()?;
        if candidates.next().is_some() {
            debug!(
                target: "coordinator.registry",
                prefix = %id,
                "Ambiguous meeting id prefix, no meeting selected"
            );
            return None;
        }
        Some(first)
    }

    /// Snapshot of every active meeting.
    #[must_use]
    pub fn values(&self) -> Vec<Meeting> {
        self.meetings
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// First meeting using the given voice bridge, if any.
    #[must_use]
    pub fn find_by_voice_bridge(&self, voice_bridge: &str) -> Option<Meeting> {
        self.meetings
            .iter()
            .find(|entry| entry.value().voice_bridge() == voice_bridge)
            .map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.meetings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }

    /// Insert (or replace) a meeting under its internal ID.
    pub(crate) fn put(&self, meeting: Meeting) -> Option<Meeting> {
        let previous = self
            .meetings
            .insert(meeting.internal_id().to_string(), meeting);
        metrics::set_meetings_active(self.meetings.len());
        previous
    }

    /// Remove a meeting by exact internal ID.
    pub(crate) fn remove(&self, internal_id: &str) -> Option<Meeting> {
        let removed = self.meetings.remove(internal_id).map(|(_, m)| m);
        metrics::set_meetings_active(self.meetings.len());
        removed
    }

    /// Apply `f` to the meeting matching `id` (exact or unique prefix).
    ///
    /// The shard lock is held while `f` runs; `f` must not touch the registry.
    pub(crate) fn update<R>(&self, id: &str, f: impl FnOnce(&mut Meeting) -> R) -> Option<R> {
        let key = self.resolve_key(id)?;
        self.meetings
            .get_mut(&key)
            .map(|mut entry| f(entry.value_mut()))
    }
}

/// User sessions keyed by token.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, UserSession>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session under `token`, replacing any previous one.
    pub fn put(&self, token: impl Into<String>, session: UserSession) -> Option<UserSession> {
        let previous = self.sessions.insert(token.into(), session);
        metrics::set_sessions_active(self.sessions.len());
        previous
    }

    #[must_use]
    pub fn get(&self, token: &str) -> Option<UserSession> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, token: &str) -> Option<UserSession> {
        let removed = self.sessions.remove(token).map(|(_, s)| s);
        metrics::set_sessions_active(self.sessions.len());
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
