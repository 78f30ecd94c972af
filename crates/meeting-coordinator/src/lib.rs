//! Meeting Coordinator Library
//!
//! In-memory coordinator for the lifecycle of concurrently active meetings
//! and the user sessions attached to them. Responsible for:
//!
//! - Tracking meetings, rosters and join sessions in shared registries
//! - Serializing every meeting mutation through one ordered event stream
//! - Reconciling meetings against wall-clock expiration policies
//! - Forwarding lifecycle commands to the messaging and recording systems
//!
//! # Architecture
//!
//! ```text
//! API tasks ──────┐
//! notifications ──┼──► MeetingCoordinator ──► queue ──► EventProcessor ──► gateways
//! sweeper timer ──┘          │                               │
//!                            └──── reads ── MeetingRegistry ◄┘ writes
//! ```
//!
//! # Key Design Decisions
//!
//! - **Single writer**: only the worker mutates meetings; readers get snapshots
//! - **Bounded intake**: producers wait at most the enqueue timeout, then the event is dropped
//! - **Panic containment**: a panicking handler is logged and counted, the worker keeps going
//! - **Volatile state**: nothing is persisted; a restart begins empty
//!
//! # Modules
//!
//! - [`actors`] - Coordinator handle, event processor worker, event types
//! - [`config`] - Configuration from environment
//! - [`domain`] - Meeting, user and session entities
//! - [`errors`] - Error types
//! - [`gateway`] - Outbound messaging and recording interfaces
//! - [`observability`] - Prometheus metrics
//! - [`recording`] - Recording query folding and playback length
//! - [`registry`] - Concurrent meeting and session registries
//! - [`sweeper`] - Periodic expiration trigger

pub mod actors;
pub mod config;
pub mod domain;
pub mod errors;
pub mod gateway;
pub mod observability;
pub mod recording;
pub mod registry;
pub mod sweeper;

pub use actors::{MeetingCoordinator, MeetingEvent};
pub use config::{Config, CoordinatorSettings};
pub use errors::CoordinatorError;
