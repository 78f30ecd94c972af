//! Intake queue monitoring.
//!
//! Depth thresholds for the event processor queue:
//!
//! | Level    | Depth        |
//! |----------|--------------|
//! | Normal   | <= 1000      |
//! | Warning  | 1001 - 5000  |
//! | Critical | > 5000       |
//!
//! Depth is sampled by the worker each time it dequeues a message.

use crate::observability::metrics;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Queue depth above which the queue is considered elevated.
pub const QUEUE_DEPTH_NORMAL: usize = 1_000;

/// Queue depth above which the queue is considered critical.
pub const QUEUE_DEPTH_WARNING: usize = 5_000;

/// Queue depth level for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueLevel {
    /// At or below normal threshold.
    Normal,
    /// Between normal and warning thresholds.
    Warning,
    /// Above warning threshold.
    Critical,
}

impl QueueLevel {
    #[must_use]
    pub fn for_depth(depth: usize) -> Self {
        if depth > QUEUE_DEPTH_WARNING {
            QueueLevel::Critical
        } else if depth > QUEUE_DEPTH_NORMAL {
            QueueLevel::Warning
        } else {
            QueueLevel::Normal
        }
    }
}

/// Counters shared between the coordinator handle (producers) and its worker.
#[derive(Debug)]
pub struct QueueMonitor {
    coordinator_id: String,
    /// Last sampled depth.
    depth: AtomicUsize,
    /// Peak sampled depth since last reset.
    peak_depth: AtomicUsize,
    messages_processed: AtomicU64,
    /// Messages dropped after the enqueue timeout.
    messages_dropped: AtomicU64,
    /// Panics caught at the dispatch boundary.
    handler_panics: AtomicU64,
}

impl QueueMonitor {
    #[must_use]
    pub fn new(coordinator_id: impl Into<String>) -> Self {
        Self {
            coordinator_id: coordinator_id.into(),
            depth: AtomicUsize::new(0),
            peak_depth: AtomicUsize::new(0),
            messages_processed: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            handler_panics: AtomicU64::new(0),
        }
    }

    /// Record the queue depth observed by the worker.
    pub fn observe_depth(&self, depth: usize) {
        let previous = self.depth.swap(depth, Ordering::Relaxed);
        self.peak_depth.fetch_max(depth, Ordering::Relaxed);
        metrics::set_queue_depth(depth);

        let level = QueueLevel::for_depth(depth);
        if level == QueueLevel::Critical {
            warn!(
                target: "coordinator.queue",
                coordinator_id = %self.coordinator_id,
                depth,
                threshold = QUEUE_DEPTH_WARNING,
                "Event queue depth critical"
            );
        } else if level == QueueLevel::Warning && QueueLevel::for_depth(previous) == QueueLevel::Normal
        {
            // Log once when crossing into the warning band
            debug!(
                target: "coordinator.queue",
                coordinator_id = %self.coordinator_id,
                depth,
                "Event queue depth elevated"
            );
        }
    }

    pub fn record_processed(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drop(&self) {
        let dropped = self.messages_dropped.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            target: "coordinator.queue",
            coordinator_id = %self.coordinator_id,
            dropped,
            "Event dropped due to backpressure"
        );
    }

    pub fn record_panic(&self) {
        self.handler_panics.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn handler_panics(&self) -> u64 {
        self.handler_panics.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn current_level(&self) -> QueueLevel {
        QueueLevel::for_depth(self.current_depth())
    }

    /// Reset peak depth to the current depth.
    pub fn reset_peak(&self) {
        self.peak_depth
            .store(self.current_depth(), Ordering::Relaxed);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(QueueLevel::for_depth(0), QueueLevel::Normal);
        assert_eq!(QueueLevel::for_depth(QUEUE_DEPTH_NORMAL), QueueLevel::Normal);
        assert_eq!(
            QueueLevel::for_depth(QUEUE_DEPTH_NORMAL + 1),
            QueueLevel::Warning
        );
        assert_eq!(
            QueueLevel::for_depth(QUEUE_DEPTH_WARNING + 1),
            QueueLevel::Critical
        );
    }

    #[test]
    fn test_depth_and_peak() {
        let monitor = QueueMonitor::new("coord-test");
        monitor.observe_depth(3);
        monitor.observe_depth(7);
        monitor.observe_depth(2);

        assert_eq!(monitor.current_depth(), 2);
        assert_eq!(monitor.peak_depth(), 7);
        assert_eq!(monitor.current_level(), QueueLevel::Normal);

        monitor.reset_peak();
        assert_eq!(monitor.peak_depth(), 2);

        monitor.observe_depth(QUEUE_DEPTH_WARNING + 10);
        assert_eq!(monitor.current_level(), QueueLevel::Critical);
    }

    #[test]
    fn test_counters() {
        let monitor = QueueMonitor::new("coord-test");
        monitor.record_processed();
        monitor.record_processed();
        monitor.record_drop();
        monitor.record_panic();

        assert_eq!(monitor.messages_processed(), 2);
        assert_eq!(monitor.messages_dropped(), 1);
        assert_eq!(monitor.handler_panics(), 1);
    }
}
