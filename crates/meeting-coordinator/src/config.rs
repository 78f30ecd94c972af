//! Meeting coordinator configuration.
//!
//! Configuration is loaded from environment variables once at startup.
//! Expiration policy values are read by the sweep and end-meeting handlers.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default minutes a meeting may stay ended before it is swept.
pub const DEFAULT_MEETING_EXPIRE_MINUTES: u64 = 1;

/// Default minutes a created meeting may wait for its first start.
pub const DEFAULT_CREATE_JOIN_MINUTES: u64 = 5;

/// Default sweep period in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Default intake queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default bounded wait for producers enqueueing an event.
pub const DEFAULT_ENQUEUE_TIMEOUT_MS: u64 = 5_000;

/// Default Prometheus exporter bind address.
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:9091";

/// Default coordinator instance ID prefix.
pub const DEFAULT_COORDINATOR_ID_PREFIX: &str = "coordinator";

/// Meeting coordinator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unique identifier for this coordinator instance.
    pub coordinator_id: String,

    /// Prometheus exporter bind address (default: "0.0.0.0:9091").
    pub metrics_bind_address: String,

    /// Sweep period in seconds (default: 60).
    pub sweep_interval_seconds: u64,

    /// Policy values handed to the event processor.
    pub settings: CoordinatorSettings,
}

/// Runtime settings consumed by the event processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Minutes an ended meeting is kept before the sweep removes it.
    pub meeting_expire_minutes: u64,

    /// Minutes a never-started meeting is kept before the sweep removes it.
    pub create_join_minutes: u64,

    /// Remove a meeting from the registry as soon as it is ended by request.
    pub remove_meeting_on_end: bool,

    /// Intake queue capacity.
    pub queue_capacity: usize,

    /// Bounded wait for producers enqueueing an event.
    pub enqueue_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            meeting_expire_minutes: DEFAULT_MEETING_EXPIRE_MINUTES,
            create_join_minutes: DEFAULT_CREATE_JOIN_MINUTES,
            remove_meeting_on_end: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            enqueue_timeout: Duration::from_millis(DEFAULT_ENQUEUE_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let metrics_bind_address = vars
            .get("COORDINATOR_METRICS_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_METRICS_BIND_ADDRESS.to_string());

        let sweep_interval_seconds = parse_var(
            vars,
            "COORDINATOR_SWEEP_INTERVAL_SECONDS",
            DEFAULT_SWEEP_INTERVAL_SECONDS,
        )?;
        if sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "COORDINATOR_SWEEP_INTERVAL_SECONDS must be greater than 0".to_string(),
            ));
        }

        let queue_capacity = parse_var(vars, "COORDINATOR_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?;
        // tokio::sync::mpsc::channel panics on zero capacity
        if queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "COORDINATOR_QUEUE_CAPACITY must be greater than 0".to_string(),
            ));
        }

        let settings = CoordinatorSettings {
            meeting_expire_minutes: parse_var(
                vars,
                "COORDINATOR_MEETING_EXPIRE_MINUTES",
                DEFAULT_MEETING_EXPIRE_MINUTES,
            )?,
            create_join_minutes: parse_var(
                vars,
                "COORDINATOR_CREATE_JOIN_MINUTES",
                DEFAULT_CREATE_JOIN_MINUTES,
            )?,
            remove_meeting_on_end: parse_var(vars, "COORDINATOR_REMOVE_MEETING_ON_END", false)?,
            queue_capacity,
            enqueue_timeout: Duration::from_millis(parse_var(
                vars,
                "COORDINATOR_ENQUEUE_TIMEOUT_MS",
                DEFAULT_ENQUEUE_TIMEOUT_MS,
            )?),
        };

        // Generate coordinator instance ID
        let coordinator_id = vars.get("COORDINATOR_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_COORDINATOR_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            coordinator_id,
            metrics_bind_address,
            sweep_interval_seconds,
            settings,
        })
    }

    /// Sweep period as a `Duration`.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{name}={raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_success_with_defaults() {
        let vars = HashMap::new();

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.metrics_bind_address, DEFAULT_METRICS_BIND_ADDRESS);
        assert_eq!(config.sweep_interval_seconds, DEFAULT_SWEEP_INTERVAL_SECONDS);
        assert_eq!(config.settings, CoordinatorSettings::default());
        assert_eq!(config.settings.meeting_expire_minutes, 1);
        assert_eq!(config.settings.create_join_minutes, 5);
        assert!(!config.settings.remove_meeting_on_end);
        assert_eq!(config.settings.enqueue_timeout, Duration::from_secs(5));
        // Coordinator ID should be auto-generated
        assert!(config.coordinator_id.starts_with("coordinator-"));
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let vars = HashMap::from([
            ("COORDINATOR_ID".to_string(), "coord-001".to_string()),
            (
                "COORDINATOR_METRICS_BIND_ADDRESS".to_string(),
                "127.0.0.1:9100".to_string(),
            ),
            (
                "COORDINATOR_SWEEP_INTERVAL_SECONDS".to_string(),
                "30".to_string(),
            ),
            (
                "COORDINATOR_MEETING_EXPIRE_MINUTES".to_string(),
                "10".to_string(),
            ),
            ("COORDINATOR_CREATE_JOIN_MINUTES".to_string(), "2".to_string()),
            (
                "COORDINATOR_REMOVE_MEETING_ON_END".to_string(),
                "true".to_string(),
            ),
            ("COORDINATOR_QUEUE_CAPACITY".to_string(), "64".to_string()),
            ("COORDINATOR_ENQUEUE_TIMEOUT_MS".to_string(), "250".to_string()),
        ]);

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.coordinator_id, "coord-001");
        assert_eq!(config.metrics_bind_address, "127.0.0.1:9100");
        assert_eq!(config.sweep_interval(), Duration::from_secs(30));
        assert_eq!(config.settings.meeting_expire_minutes, 10);
        assert_eq!(config.settings.create_join_minutes, 2);
        assert!(config.settings.remove_meeting_on_end);
        assert_eq!(config.settings.queue_capacity, 64);
        assert_eq!(config.settings.enqueue_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_from_vars_invalid_number() {
        let vars = HashMap::from([(
            "COORDINATOR_MEETING_EXPIRE_MINUTES".to_string(),
            "soon".to_string(),
        )]);

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue(v)) if v.contains("COORDINATOR_MEETING_EXPIRE_MINUTES"))
        );
    }

    #[test]
    fn test_from_vars_invalid_bool() {
        let vars = HashMap::from([(
            "COORDINATOR_REMOVE_MEETING_ON_END".to_string(),
            "yes".to_string(),
        )]);

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_from_vars_rejects_zero_capacity_and_interval() {
        let vars = HashMap::from([("COORDINATOR_QUEUE_CAPACITY".to_string(), "0".to_string())]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));

        let vars = HashMap::from([(
            "COORDINATOR_SWEEP_INTERVAL_SECONDS".to_string(),
            "0".to_string(),
        )]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
