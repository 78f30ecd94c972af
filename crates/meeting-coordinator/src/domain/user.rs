//! Meeting roster entries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role string used by the transport for moderators.
pub const ROLE_MODERATOR: &str = "MODERATOR";

/// Role string used by the transport for viewers.
pub const ROLE_VIEWER: &str = "VIEWER";

/// Status key carrying the presenter flag.
pub const STATUS_PRESENTER: &str = "presenter";

/// Status key carrying the raised-hand flag.
pub const STATUS_RAISE_HAND: &str = "raiseHand";

/// A participant in a meeting roster.
///
/// Owned by its `Meeting`; created on join and dropped on leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID, unique within the meeting.
    pub internal_user_id: String,
    /// User ID supplied by the integrating application.
    pub external_user_id: String,
    /// Display name.
    pub full_name: String,
    /// Role string as delivered by the transport (`MODERATOR`, `VIEWER`).
    pub role: String,
    status: HashMap<String, String>,
}

impl User {
    #[must_use]
    pub fn new(
        internal_user_id: impl Into<String>,
        external_user_id: impl Into<String>,
        full_name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            internal_user_id: internal_user_id.into(),
            external_user_id: external_user_id.into(),
            full_name: full_name.into(),
            role: role.into(),
            status: HashMap::new(),
        }
    }

    /// Set one status value, replacing any previous value for the key.
    pub fn set_status(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.status.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn status(&self, key: &str) -> Option<&str> {
        self.status.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn status_map(&self) -> &HashMap<String, String> {
        &self.status
    }

    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.role.eq_ignore_ascii_case(ROLE_MODERATOR)
    }

    #[must_use]
    pub fn is_presenter(&self) -> bool {
        self.status_flag(STATUS_PRESENTER)
    }

    #[must_use]
    pub fn has_raised_hand(&self) -> bool {
        self.status_flag(STATUS_RAISE_HAND)
    }

    fn status_flag(&self, key: &str) -> bool {
        self.status(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_updates_replace_previous_value() {
        let mut user = User::new("u-1", "ext-1", "Alice", ROLE_VIEWER);
        assert!(user.status("mood").is_none());

        user.set_status("mood", "happy");
        user.set_status("mood", "away");

        assert_eq!(user.status("mood"), Some("away"));
        assert_eq!(user.status_map().len(), 1);
    }

    #[test]
    fn test_convenience_status_fields() {
        let mut user = User::new("u-1", "ext-1", "Alice", ROLE_VIEWER);
        assert!(!user.is_presenter());
        assert!(!user.has_raised_hand());

        user.set_status(STATUS_PRESENTER, "true");
        user.set_status(STATUS_RAISE_HAND, "TRUE");
        assert!(user.is_presenter());
        assert!(user.has_raised_hand());

        user.set_status(STATUS_RAISE_HAND, "false");
        assert!(!user.has_raised_hand());
    }

    #[test]
    fn test_moderator_role() {
        assert!(User::new("u-1", "e", "Mod", "MODERATOR").is_moderator());
        assert!(User::new("u-2", "e", "Mod", "moderator").is_moderator());
        assert!(!User::new("u-3", "e", "View", ROLE_VIEWER).is_moderator());
    }
}
