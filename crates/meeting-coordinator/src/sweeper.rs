//! Periodic expiration sweep trigger.
//!
//! The sweeper never touches meeting state itself. Each tick it enqueues a
//! `RemoveExpiredMeetings` event and the worker applies the rules in order
//! with every other mutation.

use crate::actors::MeetingCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Spawn the sweep timer.
///
/// The first sweep fires one `interval` after spawning. Ticks missed while
/// an enqueue was blocked are skipped, not replayed.
pub fn spawn_expiry_sweeper(
    coordinator: Arc<MeetingCoordinator>,
    interval: Duration,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    // tokio intervals reject a zero period
    let interval = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            target: "coordinator.sweeper",
            interval_secs = interval.as_secs(),
            "Expiry sweeper started"
        );

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!(target: "coordinator.sweeper", "Expiry sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    debug!(target: "coordinator.sweeper", "Requesting expiration sweep");
                    if let Err(e) = coordinator.remove_expired_meetings().await {
                        warn!(
                            target: "coordinator.sweeper",
                            error = %e,
                            "Failed to enqueue expiration sweep"
                        );
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::CoordinatorSettings;
    use crate::domain::{now_millis, Meeting};
    use crate::gateway::{TracingMessagingGateway, TracingRecordingGateway};

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_triggers_removal_each_interval_until_cancelled() {
        let coordinator = Arc::new(MeetingCoordinator::new(
            "coord-test",
            CoordinatorSettings::default(),
            Arc::new(TracingMessagingGateway),
            Arc::new(TracingRecordingGateway),
        ));
        coordinator.start().await.unwrap();

        // Created an hour ago by wall clock, never started
        let created = now_millis() - 60 * 60_000;
        coordinator
            .create_meeting(Meeting::builder("m-1", "ext-1", "Idle").created_time(created).build())
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let handle = spawn_expiry_sweeper(
            Arc::clone(&coordinator),
            Duration::from_secs(60),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        coordinator.flush().await.unwrap();
        assert!(coordinator.get_meeting("m-1").is_some());

        tokio::time::sleep(Duration::from_secs(40)).await;
        coordinator.flush().await.unwrap();
        assert!(coordinator.get_meeting("m-1").is_none());

        cancel.cancel();
        handle.await.unwrap();
        coordinator.stop().await.unwrap();
    }
}
