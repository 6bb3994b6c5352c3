use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::error::ConfigError;
use crate::rate_limit_config::RateLimiterConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Parser, Validate)]
#[command(name = "dispatcher", version, about = "Path-template router with per-client rate limiting")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Requests a client may make within one rate limit window
    #[arg(long, env = "RATE_LIMIT_MAX_TOKENS", default_value_t = 20)]
    #[validate(range(min = 1))]
    pub max_tokens: u32,

    /// Rate limit window and idle-client sweep period, e.g. "30s" or "1m"
    #[arg(
        long,
        env = "RATE_LIMIT_INTERVAL",
        default_value = "1m",
        value_parser = humantime_serde::re::humantime::parse_duration
    )]
    pub interval: Duration,

    /// Disable per-client rate limiting
    #[arg(long = "no-rate-limit", env = "RATE_LIMIT_DISABLED")]
    pub rate_limit_disabled: bool,

    /// Answer with permissive CORS headers
    #[arg(long, env = "CORS")]
    pub cors: bool,

    /// Log level for the dispatcher crate
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    #[validate(custom(function = "validate_log_level"))]
    pub log_level: String,
}

impl Config {
    /// Parse command line arguments and environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::parse();
        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.rate_limiter().validate()
    }

    /// Rate limiter settings, or `None` when rate limiting is disabled.
    pub fn rate_limiting(&self) -> Option<RateLimiterConfig> {
        (!self.rate_limit_disabled).then(|| self.rate_limiter())
    }

    pub fn rate_limiter(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_tokens: self.max_tokens,
            interval: self.interval,
        }
    }
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
