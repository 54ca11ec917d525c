//! Connection tuning knobs with validated defaults.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Timing configuration shared by every connection built from one registry.
///
/// All fields have production defaults; embedding applications usually only
/// deserialize overrides for a subset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOptions {
    /// First synchronize retry delay, in seconds. Doubles per attempt.
    #[serde(default = "default_synchronization_retry_interval")]
    pub synchronization_retry_interval_in_seconds: u64,
    /// Ceiling of the synchronize retry delay, in seconds.
    #[serde(default = "default_retry_cap")]
    pub synchronization_retry_cap_in_seconds: u64,
    /// First subscribe retry delay, in seconds. Doubles per attempt.
    #[serde(default = "default_subscribe_retry_interval")]
    pub subscribe_retry_interval_in_seconds: u64,
    /// Ceiling of the subscribe retry delay, in seconds.
    #[serde(default = "default_retry_cap")]
    pub subscribe_retry_cap_in_seconds: u64,
    /// Default deadline of `wait_synchronized`, in seconds.
    #[serde(default = "default_wait_synchronized_timeout")]
    pub wait_synchronized_timeout_in_seconds: u64,
    /// Default polling interval of `wait_synchronized`, in milliseconds.
    #[serde(default = "default_wait_synchronized_interval")]
    pub wait_synchronized_interval_in_milliseconds: u64,
    /// Patience of the packet orderer before reporting a sequence gap,
    /// in seconds.
    #[serde(default = "default_packet_ordering_timeout")]
    pub packet_ordering_timeout_in_seconds: u64,
}

fn default_synchronization_retry_interval() -> u64 {
    1
}

fn default_subscribe_retry_interval() -> u64 {
    3
}

fn default_retry_cap() -> u64 {
    300
}

fn default_wait_synchronized_timeout() -> u64 {
    300
}

fn default_wait_synchronized_interval() -> u64 {
    1000
}

fn default_packet_ordering_timeout() -> u64 {
    60
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            synchronization_retry_interval_in_seconds: default_synchronization_retry_interval(),
            synchronization_retry_cap_in_seconds: default_retry_cap(),
            subscribe_retry_interval_in_seconds: default_subscribe_retry_interval(),
            subscribe_retry_cap_in_seconds: default_retry_cap(),
            wait_synchronized_timeout_in_seconds: default_wait_synchronized_timeout(),
            wait_synchronized_interval_in_milliseconds: default_wait_synchronized_interval(),
            packet_ordering_timeout_in_seconds: default_packet_ordering_timeout(),
        }
    }
}

impl ConnectionOptions {
    /// Check the options for internally inconsistent values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for zero intervals or caps below the initial
    /// delay.
    pub fn validate(&self) -> Result<()> {
        if self.synchronization_retry_interval_in_seconds == 0 {
            return Err(Error::Config(
                "synchronizationRetryIntervalInSeconds must be positive".to_string(),
            ));
        }
        if self.subscribe_retry_interval_in_seconds == 0 {
            return Err(Error::Config(
                "subscribeRetryIntervalInSeconds must be positive".to_string(),
            ));
        }
        if self.synchronization_retry_cap_in_seconds < self.synchronization_retry_interval_in_seconds
        {
            return Err(Error::Config(
                "synchronizationRetryCapInSeconds must not undercut the initial interval"
                    .to_string(),
            ));
        }
        if self.subscribe_retry_cap_in_seconds < self.subscribe_retry_interval_in_seconds {
            return Err(Error::Config(
                "subscribeRetryCapInSeconds must not undercut the initial interval".to_string(),
            ));
        }
        if self.wait_synchronized_timeout_in_seconds == 0 {
            return Err(Error::Config(
                "waitSynchronizedTimeoutInSeconds must be positive".to_string(),
            ));
        }
        if self.packet_ordering_timeout_in_seconds == 0 {
            return Err(Error::Config(
                "packetOrderingTimeoutInSeconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn subscribe_retry_interval(&self) -> Duration {
        Duration::from_secs(self.subscribe_retry_interval_in_seconds)
    }

    pub(crate) fn subscribe_retry_cap(&self) -> Duration {
        Duration::from_secs(self.subscribe_retry_cap_in_seconds)
    }

    /// Ordering timeout as a [`Duration`], for wiring into a
    /// [`PacketOrderer`](crate::core::transport::PacketOrderer).
    #[must_use]
    pub fn packet_ordering_timeout(&self) -> Duration {
        Duration::from_secs(self.packet_ordering_timeout_in_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = ConnectionOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.synchronization_retry_interval_in_seconds, 1);
        assert_eq!(options.subscribe_retry_interval_in_seconds, 3);
        assert_eq!(options.synchronization_retry_cap_in_seconds, 300);
        assert_eq!(options.wait_synchronized_timeout_in_seconds, 300);
        assert_eq!(options.wait_synchronized_interval_in_milliseconds, 1000);
        assert_eq!(options.packet_ordering_timeout_in_seconds, 60);
    }

    #[test]
    fn deserializes_partial_overrides() {
        let options: ConnectionOptions = serde_json::from_value(serde_json::json!({
            "subscribeRetryIntervalInSeconds": 5,
        }))
        .unwrap();
        assert_eq!(options.subscribe_retry_interval_in_seconds, 5);
        assert_eq!(options.synchronization_retry_interval_in_seconds, 1);
    }

    #[test]
    fn rejects_cap_below_initial_interval() {
        let options = ConnectionOptions {
            subscribe_retry_cap_in_seconds: 1,
            ..ConnectionOptions::default()
        };
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_zero_intervals() {
        let options = ConnectionOptions {
            synchronization_retry_interval_in_seconds: 0,
            ..ConnectionOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
