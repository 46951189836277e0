//! Error taxonomy for retry sequences.
//!
//! - [`ConfigError`]: invalid backoff or settings values, rejected at construction
//! - [`CancellationError`]: the signal fired while waiting between attempts
//! - [`RetryError`]: the single terminal error of a retry sequence

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Invalid retry configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `initial_delay` is larger than `max_delay`.
    #[error("initial delay {initial:?} exceeds max delay {max:?}")]
    InvertedDelays {
        /// Configured initial delay.
        initial: Duration,
        /// Configured maximum delay.
        max: Duration,
    },

    /// Multiplier is zero, negative, or not finite.
    #[error("backoff multiplier must be a finite number > 0, got {0}")]
    InvalidMultiplier(f64),

    /// Jitter outside `[0, 1]`.
    #[error("jitter must be within [0, 1], got {0}")]
    InvalidJitter(f64),

    /// A settings value could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Setting or environment variable name.
        key: String,
        /// The raw value that failed to parse.
        value: String,
    },
}

/// Why a cancellation signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum CancellationError {
    /// The signal was cancelled explicitly (or via a parent).
    #[error("operation cancelled")]
    Cancelled,

    /// The signal's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl CancellationError {
    /// Returns true if `error` is a cancellation error, either directly or
    /// behind a boxed trait object.
    pub fn is_cancellation<E: Any>(error: &E) -> bool {
        let any = error as &dyn Any;
        if any.is::<CancellationError>() {
            return true;
        }
        if let Some(boxed) = any.downcast_ref::<Box<dyn Error + Send + Sync>>() {
            return boxed.is::<CancellationError>();
        }
        if let Some(boxed) = any.downcast_ref::<Box<dyn Error>>() {
            return boxed.is::<CancellationError>();
        }
        false
    }
}

/// Terminal error of a retry sequence.
///
/// Always says *why* retrying stopped and, where one was observed, carries
/// the last failure of the wrapped operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// An attempt asked to stop with this error (non-retryable failure).
    Attempt(E),

    /// The signal fired while waiting between attempts.
    Cancelled {
        /// Which kind of cancellation fired.
        cause: CancellationError,
        /// Attempts made before cancellation.
        attempts: u32,
        /// Last non-cancellation error returned by an attempt.
        last_error: Option<E>,
    },

    /// The attempt budget ran out.
    Exhausted {
        /// Attempts made (equal to the configured maximum).
        attempts: u32,
        /// Last error returned by an attempt.
        last_error: Option<E>,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts made, if the sequence was cut short by the engine.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Attempt(_) => None,
            Self::Cancelled { attempts, .. } | Self::Exhausted { attempts, .. } => Some(*attempts),
        }
    }

    /// Most recent failure of the wrapped operation.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Attempt(err) => Some(err),
            Self::Cancelled { last_error, .. } | Self::Exhausted { last_error, .. } => {
                last_error.as_ref()
            }
        }
    }

    /// Consume and return the most recent failure of the wrapped operation.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Attempt(err) => Some(err),
            Self::Cancelled { last_error, .. } | Self::Exhausted { last_error, .. } => last_error,
        }
    }

    /// The cancellation cause, if the signal stopped the sequence.
    pub fn cancellation(&self) -> Option<CancellationError> {
        match self {
            Self::Cancelled { cause, .. } => Some(*cause),
            _ => None,
        }
    }

    /// Returns true if the signal stopped the sequence.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns true if the attempt budget ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Map the attempt error type.
    pub fn map_err<F, M>(self, mut f: M) -> RetryError<F>
    where
        M: FnMut(E) -> F,
    {
        match self {
            Self::Attempt(err) => RetryError::Attempt(f(err)),
            Self::Cancelled {
                cause,
                attempts,
                last_error,
            } => RetryError::Cancelled {
                cause,
                attempts,
                last_error: last_error.map(f),
            },
            Self::Exhausted {
                attempts,
                last_error,
            } => RetryError::Exhausted {
                attempts,
                last_error: last_error.map(f),
            },
        }
    }
}

// Not derived with thiserror: the message varies with whether a last error
// was recorded, and `source` falls back to the cancellation cause.
impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempt(err) => write!(f, "{}", err),
            Self::Cancelled {
                cause,
                attempts,
                last_error: Some(err),
            } => write!(
                f,
                "retry stopped after {} attempt(s): {}; last error: {}",
                attempts, cause, err
            ),
            Self::Cancelled {
                cause,
                attempts,
                last_error: None,
            } => write!(f, "retry stopped after {} attempt(s): {}", attempts, cause),
            Self::Exhausted {
                attempts,
                last_error: Some(err),
            } => write!(
                f,
                "maximum attempts exceeded ({}); last error: {}",
                attempts, err
            ),
            Self::Exhausted {
                attempts,
                last_error: None,
            } => write!(f, "maximum attempts exceeded ({})", attempts),
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Attempt(err) => err.source(),
            Self::Cancelled {
                last_error: Some(err),
                ..
            }
            | Self::Exhausted {
                last_error: Some(err),
                ..
            } => Some(err),
            Self::Cancelled {
                cause,
                last_error: None,
                ..
            } => Some(cause),
            Self::Exhausted {
                last_error: None, ..
            } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_display_includes_both_causes() {
        let err = RetryError::Cancelled {
            cause: CancellationError::DeadlineExceeded,
            attempts: 4,
            last_error: Some("503 from upstream"),
        };
        let display = err.to_string();
        assert!(display.contains("deadline exceeded"));
        assert!(display.contains("4 attempt(s)"));
        assert!(display.contains("503 from upstream"));
    }

    #[test]
    fn test_bare_cancellation_display() {
        let err: RetryError<&str> = RetryError::Cancelled {
            cause: CancellationError::Cancelled,
            attempts: 1,
            last_error: None,
        };
        assert_eq!(
            err.to_string(),
            "retry stopped after 1 attempt(s): operation cancelled"
        );
    }

    #[test]
    fn test_exhausted_display() {
        let err = RetryError::Exhausted {
            attempts: 3,
            last_error: Some("connection reset"),
        };
        assert_eq!(
            err.to_string(),
            "maximum attempts exceeded (3); last error: connection reset"
        );
        assert!(err.is_exhausted());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_attempt_error_is_transparent() {
        let err = RetryError::Attempt("unauthorized");
        assert_eq!(err.to_string(), "unauthorized");
        assert_eq!(err.attempts(), None);
        assert_eq!(err.into_last_error(), Some("unauthorized"));
    }

    #[test]
    fn test_source_points_at_last_error() {
        let err = RetryError::Exhausted {
            attempts: 2,
            last_error: Some(std::io::Error::other("boom")),
        };
        assert_eq!(err.source().unwrap().to_string(), "boom");

        let err: RetryError<std::io::Error> = RetryError::Cancelled {
            cause: CancellationError::Cancelled,
            attempts: 0,
            last_error: None,
        };
        assert_eq!(err.source().unwrap().to_string(), "operation cancelled");
    }

    #[test]
    fn test_map_err_keeps_metadata() {
        let err = RetryError::Exhausted {
            attempts: 5,
            last_error: Some(502u16),
        }
        .map_err(|status| format!("HTTP {}", status));

        assert_eq!(err.attempts(), Some(5));
        assert_eq!(err.last_error().map(String::as_str), Some("HTTP 502"));
    }

    #[test]
    fn test_is_cancellation_detection() {
        assert!(CancellationError::is_cancellation(
            &CancellationError::Cancelled
        ));

        let boxed: Box<dyn Error + Send + Sync> = Box::new(CancellationError::DeadlineExceeded);
        assert!(CancellationError::is_cancellation(&boxed));

        let other: Box<dyn Error + Send + Sync> = Box::new(std::io::Error::other("io"));
        assert!(!CancellationError::is_cancellation(&other));
        assert!(!CancellationError::is_cancellation(&"plain string"));
    }

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::InvalidValue {
            key: "RETRY_MULTIPLIER".to_string(),
            value: "fast".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value \"fast\" for RETRY_MULTIPLIER");
    }
}
