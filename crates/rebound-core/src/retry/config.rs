//! Retry configuration and settings loading.

use super::policy::BackoffPolicy;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff policy plus an optional attempt cap.
///
/// `max_attempts == 0` means unlimited: the sequence is bounded only by the
/// cancellation signal. The config is borrowed by each retry sequence and
/// never mutated, so one value can drive any number of concurrent sequences.
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::{BackoffPolicy, RetryConfig};
/// use std::time::Duration;
///
/// let policy = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(32), 2.0)?;
/// let config = RetryConfig::new(policy, 10);
///
/// assert_eq!(config.max_attempts(), Some(10));
/// assert_eq!(RetryConfig::default().max_attempts(), None);
/// # Ok::<(), rebound_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RetryConfig {
    policy: BackoffPolicy,
    max_attempts: u32,
}

impl RetryConfig {
    /// Create a config. `max_attempts == 0` means unlimited.
    pub fn new(policy: BackoffPolicy, max_attempts: u32) -> Self {
        Self {
            policy,
            max_attempts,
        }
    }

    /// Create a config without an attempt cap.
    pub fn unlimited(policy: BackoffPolicy) -> Self {
        Self::new(policy, 0)
    }

    /// The backoff schedule.
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// The attempt cap, or `None` when unlimited.
    pub fn max_attempts(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }

    /// Return a copy with a different attempt cap.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

impl TryFrom<RetrySettings> for RetryConfig {
    type Error = ConfigError;

    fn try_from(settings: RetrySettings) -> Result<Self, Self::Error> {
        let policy = BackoffPolicy::builder()
            .initial_delay(Duration::from_millis(settings.initial_delay_ms))
            .max_delay(Duration::from_millis(settings.max_delay_ms))
            .multiplier(settings.multiplier)
            .jitter(settings.jitter)
            .build()?;
        Ok(Self::new(policy, settings.max_attempts))
    }
}

/// Plain-data retry settings, loadable from config files or the environment.
///
/// Every field has a default, so partial documents deserialize.
///
/// ```toml
/// initial_delay_ms = 250
/// max_delay_ms = 30000
/// multiplier = 2.0
/// max_attempts = 5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on any pause, in milliseconds.
    pub max_delay_ms: u64,
    /// Exponential growth factor.
    pub multiplier: f64,
    /// Jitter fraction in `[0, 1]`.
    pub jitter: f64,
    /// Attempt cap; `0` means unlimited.
    pub max_attempts: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: BackoffPolicy::DEFAULT_INITIAL_DELAY.as_millis() as u64,
            max_delay_ms: BackoffPolicy::DEFAULT_MAX_DELAY.as_millis() as u64,
            multiplier: BackoffPolicy::DEFAULT_MULTIPLIER,
            jitter: 0.0,
            max_attempts: 0,
        }
    }
}

impl RetrySettings {
    /// Load settings from environment variables, starting from the defaults.
    ///
    /// This will look for:
    /// - `{PREFIX}_INITIAL_DELAY_MS`
    /// - `{PREFIX}_MAX_DELAY_MS`
    /// - `{PREFIX}_MULTIPLIER`
    /// - `{PREFIX}_JITTER`
    /// - `{PREFIX}_MAX_ATTEMPTS`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but does
    /// not parse.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::default().with_env(prefix)
    }

    /// Overlay environment variables on these settings.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn with_env(mut self, prefix: &str) -> Result<Self, ConfigError> {
        if let Some(value) = env_value(prefix, "INITIAL_DELAY_MS")? {
            self.initial_delay_ms = value;
        }
        if let Some(value) = env_value(prefix, "MAX_DELAY_MS")? {
            self.max_delay_ms = value;
        }
        if let Some(value) = env_value(prefix, "MULTIPLIER")? {
            self.multiplier = value;
        }
        if let Some(value) = env_value(prefix, "JITTER")? {
            self.jitter = value;
        }
        if let Some(value) = env_value(prefix, "MAX_ATTEMPTS")? {
            self.max_attempts = value;
        }
        Ok(self)
    }
}

fn env_value<T: std::str::FromStr>(prefix: &str, name: &str) -> Result<Option<T>, ConfigError> {
    let key = format!("{}_{}", prefix, name);
    let Ok(raw) = std::env::var(&key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue { key, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_attempts_is_unlimited() {
        let config = RetryConfig::unlimited(BackoffPolicy::default());
        assert_eq!(config.max_attempts(), None);
        assert_eq!(config.with_max_attempts(4).max_attempts(), Some(4));
    }

    #[test]
    fn test_settings_defaults_match_policy_defaults() {
        let config = RetryConfig::try_from(RetrySettings::default()).unwrap();
        assert_eq!(config, RetryConfig::default());
    }

    #[test]
    fn test_settings_from_toml() {
        let settings: RetrySettings = toml::from_str(
            r#"
            initial_delay_ms = 250
            max_delay_ms = 30000
            multiplier = 2.0
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.jitter, 0.0);
        let config = RetryConfig::try_from(settings).unwrap();
        assert_eq!(config.max_attempts(), Some(5));
        assert_eq!(config.policy().initial_delay(), Duration::from_millis(250));
        assert_eq!(config.policy().max_delay(), Duration::from_secs(30));
        assert_eq!(config.policy().pause(2), Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = RetrySettings {
            initial_delay_ms: 5_000,
            max_delay_ms: 1_000,
            ..RetrySettings::default()
        };
        assert!(matches!(
            RetryConfig::try_from(settings),
            Err(ConfigError::InvertedDelays { .. })
        ));
    }

    #[test]
    fn test_env_overlay() {
        temp_env::with_vars(
            [
                ("PUBLISH_RETRY_INITIAL_DELAY_MS", Some("20")),
                ("PUBLISH_RETRY_MULTIPLIER", Some("3")),
                ("PUBLISH_RETRY_MAX_ATTEMPTS", Some(" 7 ")),
                ("PUBLISH_RETRY_MAX_DELAY_MS", None),
                ("PUBLISH_RETRY_JITTER", None),
            ],
            || {
                let settings = RetrySettings::from_env("PUBLISH_RETRY").unwrap();
                assert_eq!(settings.initial_delay_ms, 20);
                assert_eq!(settings.multiplier, 3.0);
                assert_eq!(settings.max_attempts, 7);
                assert_eq!(settings.max_delay_ms, 60_000);
            },
        );
    }

    #[test]
    fn test_env_unparseable_value() {
        temp_env::with_var("NOTIFY_RETRY_MAX_ATTEMPTS", Some("lots"), || {
            let err = RetrySettings::from_env("NOTIFY_RETRY").unwrap_err();
            assert_eq!(
                err,
                ConfigError::InvalidValue {
                    key: "NOTIFY_RETRY_MAX_ATTEMPTS".to_string(),
                    value: "lots".to_string(),
                }
            );
        });
    }
}
