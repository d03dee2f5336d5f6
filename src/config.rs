//! Configuration management

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::admission::FailurePolicy;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Per-caller request budget
    pub rate_limit: RateLimitConfig,
    /// Standard-stream transport configuration
    pub stdio: StdioConfig,
}

impl Config {
    /// Load configuration from an optional YAML file and `DICE_GATEWAY_*`
    /// environment variables (`__` separates nested keys).
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be parsed,
    /// or holds values the gateway cannot run with.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed("DICE_GATEWAY_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the gateway unusable
    pub fn validate(&self) -> Result<()> {
        let rl = &self.rate_limit;
        if rl.capacity == 0 {
            return Err(Error::Config("rate_limit.capacity must be > 0".into()));
        }
        if rl.refill_rate == 0 {
            return Err(Error::Config("rate_limit.refill_rate must be > 0".into()));
        }
        if rl.interval.is_zero() {
            return Err(Error::Config("rate_limit.interval must be > 0".into()));
        }
        if rl.tool_call_cost == 0 {
            return Err(Error::Config("rate_limit.tool_call_cost must be > 0".into()));
        }
        if rl.tool_call_cost > rl.capacity {
            return Err(Error::Config(format!(
                "rate_limit.tool_call_cost ({}) exceeds capacity ({}); no call could ever be admitted",
                rl.tool_call_cost, rl.capacity
            )));
        }
        if self.stdio.caller_key.trim().is_empty() {
            return Err(Error::Config("stdio.caller_key must not be empty".into()));
        }
        if self.stdio.max_line_size == 0 {
            return Err(Error::Config("stdio.max_line_size must be > 0".into()));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 39500,
            max_body_size: 64 * 1024,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum tokens a caller can bank
    pub capacity: u32,
    /// Tokens regained per `interval`
    pub refill_rate: u32,
    /// Refill interval
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Tokens charged for one `tools/call`
    pub tool_call_cost: u32,
    /// Behaviour when the clock or bucket store is unavailable
    pub failure_policy: FailurePolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_rate: 10,
            interval: Duration::from_secs(60),
            tool_call_cost: 5,
            failure_policy: FailurePolicy::FailOpen,
        }
    }
}

/// Standard-stream transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StdioConfig {
    /// Caller identity charged for messages read from stdin
    pub caller_key: String,
    /// Maximum length of one message line (bytes)
    pub max_line_size: usize,
}

impl Default for StdioConfig {
    fn default() -> Self {
        Self {
            caller_key: "stdio".to_string(),
            max_line_size: 64 * 1024,
        }
    }
}

/// Human-readable `Duration` (de)serialization ("30s", "5m", "250ms")
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration as whole seconds (e.g., "30s")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse(s: &str) -> Result<Duration, std::num::ParseIntError> {
        let s = s.trim();
        // "ms" must be checked before the single-letter suffixes.
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>().map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>().map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>().map(|m| Duration::from_secs(m * 60))
        } else if let Some(hours) = s.strip_suffix('h') {
            hours.parse::<u64>().map(|h| Duration::from_secs(h * 3600))
        } else {
            s.parse::<u64>().map(Duration::from_secs)
        }
    }
}
