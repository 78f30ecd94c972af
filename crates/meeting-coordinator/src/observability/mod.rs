//! Observability module for the meeting coordinator.
//!
//! Metric labels are bounded to prevent cardinality explosion:
//! - `event_type`: bounded by `MeetingEvent` / `ProcessorMessage` variants
//! - `reason`: bounded sweep rules (expired, never_started, ended_on_request)
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `coordinator_meetings_active` | Gauge | none | Meetings in the registry |
//! | `coordinator_sessions_active` | Gauge | none | Sessions in the registry |
//! | `coordinator_queue_depth` | Gauge | none | Events waiting for the worker |
//! | `coordinator_events_processed_total` | Counter | `event_type` | Handled events |
//! | `coordinator_event_duration_seconds` | Histogram | `event_type` | Handler latency |
//! | `coordinator_events_dropped_total` | Counter | `event_type` | Enqueue timeouts |
//! | `coordinator_handler_panics_total` | Counter | `event_type` | Panics caught at dispatch |
//! | `coordinator_meetings_removed_total` | Counter | `reason` | Registry removals |

pub mod metrics;

pub use self::metrics::{
    init_metrics_recorder, record_event_dropped, record_event_processed, record_handler_panic,
    record_meeting_removed, set_meetings_active, set_queue_depth, set_sessions_active,
};
