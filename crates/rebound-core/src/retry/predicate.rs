//! Retryability classification.

/// Decides whether a failed attempt is worth retrying.
///
/// The retry engine never consults a predicate itself; attempt functions
/// (or helpers such as [`run_with_retry`](super::run_with_retry)) use one to
/// choose between [`RetryOutcome::Continue`](super::RetryOutcome::Continue)
/// and [`RetryOutcome::Stop`](super::RetryOutcome::Stop).
///
/// Any `Fn(&E) -> bool` is a predicate:
///
/// ```rust
/// use rebound_core::retry::RetryPredicate;
/// use std::io::{Error, ErrorKind};
///
/// let timeouts_only = |err: &Error| err.kind() == ErrorKind::TimedOut;
/// assert!(timeouts_only.is_retryable(&Error::from(ErrorKind::TimedOut)));
/// assert!(!timeouts_only.is_retryable(&Error::from(ErrorKind::NotFound)));
/// ```
pub trait RetryPredicate<E: ?Sized> {
    /// Returns true if the error should be retried.
    fn is_retryable(&self, error: &E) -> bool;
}

impl<E: ?Sized, F> RetryPredicate<E> for F
where
    F: Fn(&E) -> bool,
{
    fn is_retryable(&self, error: &E) -> bool {
        self(error)
    }
}

/// Predicate that retries every error.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn is_retryable(&self, _error: &E) -> bool {
        true
    }
}

/// Predicate that never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl<E: ?Sized> RetryPredicate<E> for NeverRetry {
    fn is_retryable(&self, _error: &E) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum PublishError {
        Unavailable,
        InvalidTopic,
    }

    #[test]
    fn test_closure_predicate() {
        let transient = |err: &PublishError| matches!(err, PublishError::Unavailable);
        assert!(transient.is_retryable(&PublishError::Unavailable));
        assert!(!transient.is_retryable(&PublishError::InvalidTopic));
    }

    #[test]
    fn test_fixed_predicates() {
        assert!(AlwaysRetry.is_retryable(&PublishError::InvalidTopic));
        assert!(!NeverRetry.is_retryable(&PublishError::Unavailable));
    }

    #[test]
    fn test_unsized_errors() {
        let predicate = |err: &str| err.starts_with("503");
        assert!(RetryPredicate::<str>::is_retryable(&predicate, "503 unavailable"));
        assert!(!RetryPredicate::<str>::is_retryable(&predicate, "404 not found"));
    }
}
