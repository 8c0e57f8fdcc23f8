use crate::error::{Result, RuleError};
use crate::features::Address;
use std::time::Duration;

/// Defaults for live monitoring
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SUBJECT: &str = "application";
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_FRIDA_SCRIPT: &str = "frida_scripts/monitor_file_ops.js";

/// Settings for a watch session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// How often accumulated features are re-evaluated
    pub poll_interval: Duration,
    /// Grace period between SIGTERM and kill when stopping the observed process
    pub stop_timeout: Duration,
    /// Address reported for matches (the monitored program as a whole)
    pub subject: Address,
    /// Number of features listed in the closing statistics
    pub top_n: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            subject: Address::new(DEFAULT_SUBJECT),
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl WatchConfig {
    /// Create a watch configuration with validation
    pub fn new(
        poll_interval: Duration,
        stop_timeout: Duration,
        subject: impl Into<String>,
        top_n: usize,
    ) -> Result<Self> {
        if poll_interval.is_zero() {
            return Err(RuleError::configuration("poll interval must be greater than 0"));
        }
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(RuleError::configuration("subject address must not be empty"));
        }

        Ok(Self {
            poll_interval,
            stop_timeout,
            subject: Address::new(subject),
            top_n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WatchConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.stop_timeout, Duration::from_secs(5));
        assert_eq!(config.subject.as_str(), "application");
        assert_eq!(config.top_n, 5);
    }

    #[test]
    fn test_config_validation() {
        assert!(WatchConfig::new(Duration::ZERO, DEFAULT_STOP_TIMEOUT, "app", 5).is_err());
        assert!(WatchConfig::new(DEFAULT_POLL_INTERVAL, DEFAULT_STOP_TIMEOUT, "  ", 5).is_err());

        let config =
            WatchConfig::new(Duration::from_millis(250), Duration::ZERO, "com.example", 0).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.subject.as_str(), "com.example");
    }
}
