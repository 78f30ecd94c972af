//! # Coordinator Test Utilities
//!
//! Shared test utilities for the meeting coordinator.
//!
//! This crate provides mock gateways and test fixtures for exercising the
//! coordinator without a messaging transport or recording store.
//!
//! ## Modules
//!
//! - `mock_messaging` - Messaging gateway with a call journal and subscription store
//! - `mock_recording` - Recording gateway with stubbed rows and an ingest journal
//! - `fixtures` - Backdated meetings, roster events, recording rows
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coordinator_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let messaging = MockMessagingGateway::new();
//!     let recordings = MockRecordingGateway::new();
//!     let coordinator = MeetingCoordinator::new(
//!         "coord-test",
//!         CoordinatorSettings::default(),
//!         Arc::new(messaging.clone()),
//!         Arc::new(recordings.clone()),
//!     );
//!     coordinator.start().await.unwrap();
//!
//!     let meeting = TestMeeting::new("meeting-123").recorded().ended_minutes_ago(10);
//!     coordinator.create_meeting(meeting.build()).await.unwrap();
//!     coordinator.remove_expired_meetings().await.unwrap();
//!     coordinator.flush().await.unwrap();
//!
//!     assert_eq!(recordings.ingested(), vec!["meeting-123".to_string()]);
//! }
//! ```

pub mod fixtures;
pub mod mock_messaging;
pub mod mock_recording;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_messaging::*;
pub use mock_recording::*;
