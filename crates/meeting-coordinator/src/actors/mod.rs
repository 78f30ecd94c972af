//! Serialized event processing.
//!
//! ```text
//! producers ──► MeetingCoordinator (handle) ──► bounded mpsc ──► EventProcessor (one task)
//!                        │                                              │
//!                        └── snapshot reads ◄── MeetingRegistry ◄───────┘ writes
//! ```
//!
//! - [`coordinator`] - public handle: enqueue, reads, start/stop
//! - [`processor`] - the worker and its handlers, including the sweep rules
//! - [`messages`] - `MeetingEvent` and the control messages
//! - [`metrics`] - intake queue monitoring

pub mod coordinator;
pub mod messages;
pub mod metrics;
mod processor;

pub use coordinator::MeetingCoordinator;
pub use messages::{MeetingEvent, ProcessorMessage};
pub use self::metrics::{QueueLevel, QueueMonitor};
