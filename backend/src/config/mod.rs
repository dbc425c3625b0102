//! Central module for application-wide configuration settings.
//!
//! This module handles the scheduling parameters of the reporter (how often
//! metrics are refreshed, how long to wait for the node RPC at start) and
//! whether snapshots are exported to the remote metrics server.

use std::time::Duration;

const UPDATE_INTERVAL_ENV: &str = "LNMETRICS_UPDATE_INTERVAL_SECS";
const INIT_DELAY_ENV: &str = "LNMETRICS_INIT_DELAY_SECS";
const PUBLISH_ENV: &str = "LNMETRICS_PUBLISH";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Reporter configuration.
///
/// ```rust
/// use std::time::Duration;
/// use backend::config::Config;
///
/// let config = Config::new()
///     .update_interval(Duration::from_secs(600))
///     .publish(false);
/// assert!(!config.publish);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Period of the recurring update.
    pub update_interval: Duration,
    /// Delay before the one-shot init, the node RPC may not be ready at start.
    pub init_delay: Duration,
    /// Export snapshots to the metrics server after persisting them.
    pub publish: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            update_interval: Duration::from_secs(30 * 60),
            init_delay: Duration::from_secs(10),
            publish: true,
        }
    }

    /// Defaults overridden by the `LNMETRICS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        if let Some(value) = lookup(UPDATE_INTERVAL_ENV) {
            config.update_interval = Duration::from_secs(parse_secs(UPDATE_INTERVAL_ENV, &value)?);
        }
        if let Some(value) = lookup(INIT_DELAY_ENV) {
            config.init_delay = Duration::from_secs(parse_secs(INIT_DELAY_ENV, &value)?);
        }
        if let Some(value) = lookup(PUBLISH_ENV) {
            config.publish = value
                .trim()
                .parse()
                .map_err(|err: std::str::ParseBoolError| ConfigError::InvalidValue {
                    key: PUBLISH_ENV,
                    value: value.clone(),
                    reason: err.to_string(),
                })?;
        }
        Ok(config)
    }

    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn publish(mut self, enabled: bool) -> Self {
        self.publish = enabled;
        self
    }

    /// Rejects zero periods, which the timers cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("update_interval"));
        }
        if self.init_delay.is_zero() {
            return Err(ConfigError::ZeroDuration("init_delay"));
        }
        Ok(())
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|err: std::num::ParseIntError| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: err.to_string(),
        })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(secs)
}
