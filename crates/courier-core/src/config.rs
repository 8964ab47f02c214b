//! Agent configuration.
//!
//! The library never reads the process environment itself; the binary decides
//! when to call [`AgentConfig::from_env`] (after loading `.env`, for example)
//! and hands the result down.

use std::time::Duration;

use crate::error::ConfigError;
use crate::executor::DEFAULT_EXEC_TIMEOUT;
use crate::processor::{DEFAULT_POLL_TIMEOUT, DEFAULT_SHUTDOWN_GRACE};
use crate::queue::QUEUE_KEY_PREFIX;

/// Runtime configuration for one agent process.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Static identity of this agent; selects the queue it consumes.
    pub agent_id: String,
    pub redis_host: String,
    pub redis_port: u16,
    /// Prefix of per-agent queue keys.
    pub queue_prefix: String,
    /// How long one blocking pop waits before ticking empty.
    pub poll_timeout: Duration,
    /// Hard wall-clock deadline for one shell execution.
    pub exec_timeout: Duration,
    /// How long in-flight work gets on shutdown before the loop is aborted.
    pub shutdown_grace: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_id: "agent-001".to_string(),
            redis_host: "127.0.0.1".to_string(),
            redis_port: 6379,
            queue_prefix: QUEUE_KEY_PREFIX.to_string(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            exec_timeout: DEFAULT_EXEC_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl AgentConfig {
    /// Read configuration from the process environment.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] but with an injectable lookup, so tests
    /// never touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup("COURIER_AGENT_ID") {
            config.agent_id = value;
        }
        if let Some(value) = lookup("COURIER_REDIS_HOST") {
            config.redis_host = value;
        }
        if let Some(value) = lookup("COURIER_REDIS_PORT") {
            config.redis_port = parse("COURIER_REDIS_PORT", &value)?;
        }
        if let Some(value) = lookup("COURIER_QUEUE_PREFIX") {
            config.queue_prefix = value;
        }
        if let Some(value) = lookup("COURIER_POLL_TIMEOUT_SECS") {
            config.poll_timeout = Duration::from_secs(parse("COURIER_POLL_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = lookup("COURIER_EXEC_TIMEOUT_SECS") {
            config.exec_timeout = Duration::from_secs(parse("COURIER_EXEC_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = lookup("COURIER_SHUTDOWN_GRACE_SECS") {
            config.shutdown_grace =
                Duration::from_secs(parse("COURIER_SHUTDOWN_GRACE_SECS", &value)?);
        }
        Ok(config)
    }

    /// Connection URL for the redis-backed queue and store.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn defaults_cover_the_whole_surface() {
        let config = AgentConfig::default();
        assert_eq!(config.agent_id, "agent-001");
        assert_eq!(config.redis_host, "127.0.0.1");
        assert_eq!(config.redis_port, 6379);
        assert_eq!(config.queue_prefix, "agent:tasks:");
        assert_eq!(config.poll_timeout, Duration::from_secs(5));
        assert_eq!(config.exec_timeout, Duration::from_secs(60));
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = AgentConfig::from_lookup(lookup_from(&[
            ("COURIER_AGENT_ID", "agent-042"),
            ("COURIER_REDIS_HOST", "redis.internal"),
            ("COURIER_REDIS_PORT", "6380"),
            ("COURIER_POLL_TIMEOUT_SECS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.agent_id, "agent-042");
        assert_eq!(config.redis_url(), "redis://redis.internal:6380");
        assert_eq!(config.poll_timeout, Duration::from_secs(1));
        // untouched keys keep defaults
        assert_eq!(config.exec_timeout, Duration::from_secs(60));
    }

    #[test]
    fn unparseable_number_is_rejected_with_the_key_name() {
        let err = AgentConfig::from_lookup(lookup_from(&[("COURIER_REDIS_PORT", "not-a-port")]))
            .unwrap_err();
        match err {
            ConfigError::Invalid { key, value } => {
                assert_eq!(key, "COURIER_REDIS_PORT");
                assert_eq!(value, "not-a-port");
            }
        }
    }
}
