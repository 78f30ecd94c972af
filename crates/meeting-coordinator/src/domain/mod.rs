//! Domain entities owned by the coordinator.
//!
//! - [`meeting`] - `Meeting` lifecycle state, roster and timing predicates
//! - [`user`] - `User` roster entries with an open status map
//! - [`session`] - `UserSession` join credentials keyed by token
//!
//! All timestamps are Unix epoch milliseconds. A value of `0` means "unset".

pub mod meeting;
pub mod session;
pub mod user;

pub use meeting::{Meeting, MeetingBuilder};
pub use session::UserSession;
pub use user::User;

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Convert a minute count to milliseconds, saturating on overflow.
#[must_use]
pub(crate) fn minutes_to_millis(minutes: u64) -> i64 {
    i64::try_from(minutes)
        .unwrap_or(i64::MAX)
        .saturating_mul(60_000)
}
