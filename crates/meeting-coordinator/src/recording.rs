//! Recording query results.
//!
//! The recording store returns one row per (recording, playback format). The
//! coordinator folds those rows into one [`Recording`] per recording ID, each
//! carrying a [`Playback`] per row.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Metadata key holding the external meeting ID of a recording.
pub const METADATA_MEETING_ID: &str = "meetingId";

/// Metadata key holding the meeting name of a recording.
pub const METADATA_MEETING_NAME: &str = "meetingName";

const MILLIS_PER_MINUTE: i64 = 60_000;

/// One way of playing a recording back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playback {
    pub format: String,
    pub url: String,
    /// Length in whole minutes, rounded up.
    pub length: i64,
}

impl Playback {
    #[must_use]
    pub fn new(format: impl Into<String>, url: impl Into<String>, length: i64) -> Self {
        Self {
            format: format.into(),
            url: url.into(),
            length,
        }
    }
}

/// A recording, either as a raw store row or folded with all its playbacks.
///
/// Timestamps and the explicit playback duration are kept as the strings the
/// store returns; they are parsed only when computing playback length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub meeting_id: String,
    pub name: String,
    pub published: bool,
    /// Epoch milliseconds as text.
    pub start_time: String,
    /// Epoch milliseconds as text.
    pub end_time: String,
    pub playback_format: String,
    pub playback_link: String,
    /// Explicit playback length in milliseconds as text; may be empty.
    pub playback_duration: String,
    pub metadata: HashMap<String, String>,
    pub playbacks: Vec<Playback>,
}

/// Fold raw rows into one `Recording` per ID.
///
/// The first row seen for an ID becomes the folded record: its
/// `meetingId`/`meetingName` metadata entries move into `meeting_id`/`name`.
/// Every row, including the first, contributes one `Playback`.
#[must_use]
pub fn reorder_recordings(rows: Vec<Recording>) -> HashMap<String, Recording> {
    let mut folded: HashMap<String, Recording> = HashMap::new();

    for mut row in rows {
        let playback = Playback::new(
            row.playback_format.clone(),
            row.playback_link.clone(),
            recording_duration_minutes(&row.playback_duration, &row.end_time, &row.start_time),
        );

        match folded.get_mut(&row.id) {
            Some(existing) => existing.playbacks.push(playback),
            None => {
                if let Some(meeting_id) = row.metadata.remove(METADATA_MEETING_ID) {
                    row.meeting_id = meeting_id;
                }
                if let Some(name) = row.metadata.remove(METADATA_MEETING_NAME) {
                    row.name = name;
                }
                row.playbacks = vec![playback];
                folded.insert(row.id.clone(), row);
            }
        }
    }

    folded
}

/// Playback length in minutes, rounded up.
///
/// Uses `playback_duration` (milliseconds) when non-empty, otherwise
/// `end - start`. Any unparsable input yields 0.
#[must_use]
pub fn recording_duration_minutes(playback_duration: &str, end: &str, start: &str) -> i64 {
    let millis = if playback_duration.is_empty() {
        parse_millis(end)
            .zip(parse_millis(start))
            .and_then(|(end, start)| end.checked_sub(start))
    } else {
        parse_millis(playback_duration)
    };

    match millis {
        Some(ms) => ceil_minutes(ms),
        None => {
            debug!(
                target: "coordinator.recording",
                playback_duration = %playback_duration,
                end = %end,
                start = %start,
                "Unparsable recording duration, defaulting to 0"
            );
            0
        }
    }
}

fn parse_millis(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn ceil_minutes(ms: i64) -> i64 {
    let whole = ms / MILLIS_PER_MINUTE;
    if ms % MILLIS_PER_MINUTE > 0 {
        whole + 1
    } else {
        whole
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn row(id: &str, format: &str, link: &str) -> Recording {
        Recording {
            id: id.to_string(),
            start_time: "1700000000000".to_string(),
            end_time: "1700000090000".to_string(),
            playback_format: format.to_string(),
            playback_link: link.to_string(),
            metadata: HashMap::from([
                (METADATA_MEETING_ID.to_string(), "ext-42".to_string()),
                (METADATA_MEETING_NAME.to_string(), "Standup".to_string()),
                ("course".to_string(), "cs101".to_string()),
            ]),
            ..Recording::default()
        }
    }

    #[test]
    fn test_rows_with_same_id_collapse_into_playbacks() {
        let rows = vec![
            row("rec-1", "presentation", "https://play/rec-1/presentation"),
            row("rec-2", "presentation", "https://play/rec-2/presentation"),
            row("rec-1", "video", "https://play/rec-1/video"),
        ];

        let folded = reorder_recordings(rows);
        assert_eq!(folded.len(), 2);

        let rec = &folded["rec-1"];
        assert_eq!(rec.playbacks.len(), 2);
        assert_eq!(rec.playbacks[0].format, "presentation");
        assert_eq!(rec.playbacks[1].format, "video");
        assert_eq!(rec.playbacks[1].url, "https://play/rec-1/video");
        assert_eq!(folded["rec-2"].playbacks.len(), 1);
    }

    #[test]
    fn test_reserved_metadata_moves_to_fields() {
        let folded = reorder_recordings(vec![row("rec-1", "presentation", "l")]);
        let rec = &folded["rec-1"];

        assert_eq!(rec.meeting_id, "ext-42");
        assert_eq!(rec.name, "Standup");
        assert!(!rec.metadata.contains_key(METADATA_MEETING_ID));
        assert!(!rec.metadata.contains_key(METADATA_MEETING_NAME));
        assert_eq!(rec.metadata.get("course").map(String::as_str), Some("cs101"));
    }

    #[test]
    fn test_duration_prefers_explicit_field() {
        assert_eq!(recording_duration_minutes("120000", "0", "0"), 2);
        assert_eq!(recording_duration_minutes("120001", "", ""), 3);
    }

    #[test]
    fn test_duration_falls_back_to_start_end() {
        // 90 seconds rounds up to 2 minutes
        assert_eq!(
            recording_duration_minutes("", "1700000090000", "1700000000000"),
            2
        );
        assert_eq!(
            recording_duration_minutes("", "1700000060000", "1700000000000"),
            1
        );

        let folded = reorder_recordings(vec![row("rec-1", "presentation", "l")]);
        assert_eq!(folded["rec-1"].playbacks[0].length, 2);
    }

    #[test]
    fn test_duration_defaults_to_zero_on_parse_failure() {
        assert_eq!(recording_duration_minutes("", "not-a-time", "1700000000000"), 0);
        assert_eq!(recording_duration_minutes("", "1700000000000", ""), 0);
        assert_eq!(recording_duration_minutes("abc", "1700000090000", "1700000000000"), 0);
    }
}
