//! `UserSession` - a join credential keyed by an opaque token.
//!
//! Sessions have their own lifecycle: they are issued when a user is
//! authorized to join and removed when consumed or invalidated. Removing a
//! meeting does not remove its sessions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Opaque session token (registry key).
    pub token: String,
    /// Internal ID of the meeting the user was authorized for.
    pub meeting_id: String,
    pub external_meeting_id: String,
    pub internal_user_id: String,
    pub external_user_id: String,
    pub full_name: String,
    pub role: String,
    pub conference_name: String,
    pub voice_bridge: String,
    pub record: bool,
    pub welcome: String,
    pub logout_url: String,
    pub avatar_url: String,
    /// Issue time in epoch milliseconds.
    pub created_at: i64,
}

impl UserSession {
    /// Create a session with the identifying fields; descriptive fields start empty.
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        meeting_id: impl Into<String>,
        internal_user_id: impl Into<String>,
        full_name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            meeting_id: meeting_id.into(),
            external_meeting_id: String::new(),
            internal_user_id: internal_user_id.into(),
            external_user_id: String::new(),
            full_name: full_name.into(),
            role: role.into(),
            conference_name: String::new(),
            voice_bridge: String::new(),
            record: false,
            welcome: String::new(),
            logout_url: String::new(),
            avatar_url: String::new(),
            created_at: super::now_millis(),
        }
    }

    /// Generate a fresh random session token.
    #[must_use]
    pub fn generate_token() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique() {
        let a = UserSession::generate_token();
        let b = UserSession::generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_session_serializes_to_json() {
        let session = UserSession::new("tok-1", "int-1", "u-1", "Alice", "VIEWER");
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["token"], "tok-1");
        assert_eq!(json["meeting_id"], "int-1");

        let back: UserSession = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }
}
