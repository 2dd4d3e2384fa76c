//! Engine configuration.

use std::time::Duration;
use thiserror::Error;

/// Environment variable names read by [`EngineConfig::from_env`].
pub const STORE_TIMEOUT_VAR: &str = "CONTINUITY_STORE_TIMEOUT_MS";
pub const MAX_RETRIES_VAR: &str = "CONTINUITY_MAX_RETRIES";
pub const RETRY_BACKOFF_VAR: &str = "CONTINUITY_RETRY_BACKOFF_MS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Bounds on store access and retry behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on any single store call.
    pub store_timeout: Duration,

    /// Attempts after the first one for retryable failures.
    pub max_retries: u32,

    /// Base delay between attempts; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }

    /// Set the per-call store timeout.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Set the number of retries for retryable failures.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base retry backoff.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Defaults overridden by any of the `CONTINUITY_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading from an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        if let Some(ms) = read_number(&lookup, STORE_TIMEOUT_VAR)? {
            config.store_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = read_number(&lookup, MAX_RETRIES_VAR)? {
            config.max_retries = u32::try_from(retries).map_err(|_| ConfigError::InvalidNumber {
                var: MAX_RETRIES_VAR,
                value: retries.to_string(),
            })?;
        }
        if let Some(ms) = read_number(&lookup, RETRY_BACKOFF_VAR)? {
            config.retry_backoff = Duration::from_millis(ms);
        }
        Ok(config)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(attempt)
    }
}

fn read_number<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber { var, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::new());
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (STORE_TIMEOUT_VAR, "250"),
            (MAX_RETRIES_VAR, " 5 "),
            (RETRY_BACKOFF_VAR, "10"),
        ]))
        .unwrap();
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.backoff_for(3), Duration::from_millis(30));
    }

    #[test]
    fn test_invalid_value() {
        let err = EngineConfig::from_lookup(lookup(&[(MAX_RETRIES_VAR, "many")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: MAX_RETRIES_VAR,
                value: "many".into()
            }
        );
    }
}
