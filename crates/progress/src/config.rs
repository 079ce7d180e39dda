//! Poller configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time between status queries.
pub const DEFAULT_INTERVAL_MS: u64 = 2000;

/// Default number of non-complete responses before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 150;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Interval of zero would spin on the status endpoint
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    /// A budget of zero could never observe completion
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
}

/// Fixed-interval polling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Milliseconds between status queries
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Non-complete responses tolerated before timing out
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollerConfig {
    /// Interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Longest time a poller can run, ignoring request latency.
    pub fn budget(&self) -> Duration {
        self.interval() * self.max_attempts.saturating_sub(1)
    }

    /// Reject settings the poller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poller_config_default() {
        let config = PollerConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(2));
        assert_eq!(config.max_attempts, 150);
        assert!(config.validate().is_ok());
        assert_eq!(config.budget(), Duration::from_secs(298));
    }

    #[test]
    fn test_poller_config_rejects_zero() {
        let config = PollerConfig {
            interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));

        let config = PollerConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroAttempts));
    }

    #[test]
    fn test_poller_config_partial_toml() {
        let config: PollerConfig = toml::from_str("max_attempts = 10").unwrap();
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.interval_ms, DEFAULT_INTERVAL_MS);
    }
}
