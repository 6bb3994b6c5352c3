use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Burst capacity and window for the per-client rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Requests a client may make before being denied within one window.
    pub max_tokens: u32,
    /// Window length, also the period of the idle-client sweep.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_tokens: 20,
            interval: Duration::from_secs(60),
        }
    }
}

impl RateLimiterConfig {
    pub fn new(max_tokens: u32, interval: Duration) -> Result<Self, ConfigError> {
        let config = Self {
            max_tokens,
            interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate limiter parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tokens == 0 {
            return Err(ConfigError::RateLimiter(
                "max tokens must be greater than 0".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(ConfigError::RateLimiter(
                "interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
