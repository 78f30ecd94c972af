//! Meeting Coordinator
//!
//! Standalone coordinator process. Without a transport wired in it uses the
//! tracing-only gateways, which makes it useful for soak-testing the event
//! loop and sweeper.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder and scrape listener
//! 3. Build and start the coordinator
//! 4. Spawn the expiry sweeper
//! 5. Wait for shutdown signal, then stop the sweeper and the worker

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;

use meeting_coordinator::config::Config;
use meeting_coordinator::gateway::{TracingMessagingGateway, TracingRecordingGateway};
use meeting_coordinator::observability::init_metrics_recorder;
use meeting_coordinator::sweeper::spawn_expiry_sweeper;
use meeting_coordinator::MeetingCoordinator;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meeting_coordinator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Meeting Coordinator");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        coordinator_id = %config.coordinator_id,
        metrics_bind_address = %config.metrics_bind_address,
        sweep_interval_seconds = config.sweep_interval_seconds,
        meeting_expire_minutes = config.settings.meeting_expire_minutes,
        create_join_minutes = config.settings.create_join_minutes,
        remove_meeting_on_end = config.settings.remove_meeting_on_end,
        queue_capacity = config.settings.queue_capacity,
        "Configuration loaded successfully"
    );

    // Metrics must be installed before anything records
    info!("Initializing Prometheus metrics recorder...");
    let metrics_addr: SocketAddr = config.metrics_bind_address.parse().map_err(|e| {
        error!(error = %e, "Invalid metrics bind address");
        format!("Invalid metrics bind address: {e}")
    })?;
    init_metrics_recorder(metrics_addr).map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        format!("Failed to install Prometheus metrics recorder: {e}")
    })?;
    info!(addr = %metrics_addr, "Prometheus metrics recorder initialized");

    let coordinator = Arc::new(MeetingCoordinator::new(
        config.coordinator_id.clone(),
        config.settings.clone(),
        Arc::new(TracingMessagingGateway),
        Arc::new(TracingRecordingGateway),
    ));
    coordinator.start().await?;

    let shutdown_token = CancellationToken::new();
    let sweeper = spawn_expiry_sweeper(
        Arc::clone(&coordinator),
        config.sweep_interval(),
        shutdown_token.child_token(),
    );

    info!("Meeting Coordinator running");

    // Wait for shutdown signal
    signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping...");

    shutdown_token.cancel();
    if let Err(e) = sweeper.await {
        error!(error = %e, "Expiry sweeper task failed");
    }
    coordinator.stop().await?;

    info!(
        meetings = coordinator.meetings().len(),
        messages_processed = coordinator.monitor().messages_processed(),
        messages_dropped = coordinator.monitor().messages_dropped(),
        "Meeting Coordinator shutdown complete"
    );

    Ok(())
}
