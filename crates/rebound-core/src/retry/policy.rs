//! Exponential backoff policy.

use crate::error::ConfigError;
use std::time::Duration;

/// Exponential backoff schedule.
///
/// Pauses between attempts grow by `multiplier` each time, starting at
/// `initial_delay` and saturating at `max_delay`.
///
/// # Mathematical Formula
///
/// For attempt `n` (1-indexed, the attempt that just failed):
/// ```text
/// base_pause = initial_delay * (multiplier ^ (n - 1))
/// pause      = clamp(base_pause, initial_delay, max_delay)
/// ```
///
/// A multiplier in `(0, 1]` is accepted but never grows: every pause equals
/// `initial_delay`.
///
/// # Jitter
///
/// [`jittered_pause`](Self::jittered_pause) scales the pause by a uniform
/// factor in `[1 - jitter, 1 + jitter]` and caps it at `max_delay`. The
/// deterministic [`pause`](Self::pause) never applies jitter.
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::BackoffPolicy;
/// use std::time::Duration;
///
/// let policy = BackoffPolicy::new(
///     Duration::from_millis(100),
///     Duration::from_secs(1),
///     2.0,
/// )?;
///
/// assert_eq!(policy.pause(1), Duration::from_millis(100));
/// assert_eq!(policy.pause(2), Duration::from_millis(200));
/// assert_eq!(policy.pause(5), Duration::from_secs(1)); // capped
/// # Ok::<(), rebound_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

impl BackoffPolicy {
    /// Default initial delay (100ms).
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);
    /// Default maximum delay (60s).
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);
    /// Default multiplier.
    pub const DEFAULT_MULTIPLIER: f64 = 1.3;

    /// Create a validated policy without jitter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `initial > max`, or if `multiplier` is not a
    /// finite number greater than zero.
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Result<Self, ConfigError> {
        Self::builder()
            .initial_delay(initial)
            .max_delay(max)
            .multiplier(multiplier)
            .build()
    }

    /// Create a new builder seeded with the defaults.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rebound_core::retry::BackoffPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = BackoffPolicy::builder()
    ///     .initial_delay(Duration::from_millis(500))
    ///     .max_delay(Duration::from_secs(30))
    ///     .jitter(0.1)
    ///     .build()?;
    /// # Ok::<(), rebound_core::ConfigError>(())
    /// ```
    pub fn builder() -> BackoffPolicyBuilder {
        BackoffPolicyBuilder::default()
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Upper bound on any pause.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Growth factor between consecutive pauses.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Jitter fraction in `[0, 1]`.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Pause to wait after attempt `attempt` (1-indexed) has failed.
    ///
    /// Deterministic and non-decreasing in `attempt`. `attempt = 0` is
    /// treated as the first attempt.
    pub fn pause(&self, attempt: u32) -> Duration {
        if self.multiplier <= 1.0 {
            return self.initial_delay;
        }

        let exponent = attempt.saturating_sub(1);
        let exponent = i32::try_from(exponent).unwrap_or(i32::MAX);
        let nanos = self.initial_delay.as_nanos() as f64 * self.multiplier.powi(exponent);

        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }

        Duration::from_nanos(nanos.round() as u64).clamp(self.initial_delay, self.max_delay)
    }

    /// [`pause`](Self::pause) spread uniformly over `±jitter`, capped at
    /// `max_delay`.
    pub fn jittered_pause(&self, attempt: u32) -> Duration {
        let base = self.pause(attempt);
        if self.jitter <= 0.0 {
            return base;
        }

        // factor in [1 - jitter, 1 + jitter]
        let factor = 1.0 + self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
        Duration::try_from_secs_f64(base.as_secs_f64() * factor.max(0.0))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for BackoffPolicy {
    /// 100ms initial delay, 60s cap, multiplier 1.3, no jitter.
    fn default() -> Self {
        Self {
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
            multiplier: Self::DEFAULT_MULTIPLIER,
            jitter: 0.0,
        }
    }
}

/// Builder for [`BackoffPolicy`].
///
/// Unset fields fall back to the [`BackoffPolicy::default`] values.
#[derive(Debug, Default, Clone)]
pub struct BackoffPolicyBuilder {
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
}

impl BackoffPolicyBuilder {
    /// Set the delay before the first retry.
    ///
    /// Default: 100ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the maximum delay between attempts.
    ///
    /// Default: 60s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the exponential multiplier.
    ///
    /// Default: 1.3
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Set the jitter fraction (0.0 to 1.0).
    ///
    /// Default: 0.0
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Validate and build the policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an inverted delay range, a non-positive or
    /// non-finite multiplier, or a jitter outside `[0, 1]`.
    pub fn build(self) -> Result<BackoffPolicy, ConfigError> {
        let initial_delay = self
            .initial_delay
            .unwrap_or(BackoffPolicy::DEFAULT_INITIAL_DELAY);
        let max_delay = self.max_delay.unwrap_or(BackoffPolicy::DEFAULT_MAX_DELAY);
        let multiplier = self.multiplier.unwrap_or(BackoffPolicy::DEFAULT_MULTIPLIER);
        let jitter = self.jitter.unwrap_or(0.0);

        if initial_delay > max_delay {
            return Err(ConfigError::InvertedDelays {
                initial: initial_delay,
                max: max_delay,
            });
        }
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ConfigError::InvalidMultiplier(multiplier));
        }
        if !(0.0..=1.0).contains(&jitter) {
            return Err(ConfigError::InvalidJitter(jitter));
        }

        if multiplier <= 1.0 {
            tracing::warn!(
                multiplier,
                initial_delay = ?initial_delay,
                "backoff multiplier <= 1.0 never grows; every pause equals the initial delay"
            );
        }

        Ok(BackoffPolicy {
            initial_delay,
            max_delay,
            multiplier,
            jitter,
        })
    }
}
