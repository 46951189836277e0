//! Externally owned cancellation signal observed between attempts.

use crate::error::CancellationError;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation token with an optional deadline.
///
/// The retry engine only reads the signal; whoever created it decides when
/// it fires. A deadline behaves exactly like an explicit cancel, except that
/// it is reported as [`CancellationError::DeadlineExceeded`].
///
/// Cloning shares the underlying token: cancelling any clone cancels all of
/// them.
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::CancellationSignal;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let parent = CancellationSignal::new();
/// let child = parent.child().with_timeout(Duration::from_secs(30));
///
/// parent.cancel();
/// assert!(child.is_cancelled());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancellationSignal {
    /// A signal that only fires when cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Add a deadline. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Add a deadline `timeout` from now.
    ///
    /// "Now" is `tokio::time::Instant::now()`, so inside a runtime with a
    /// paused clock the deadline follows the test clock.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    /// Derive a signal that fires when this one is cancelled, but whose own
    /// cancellation does not propagate upward. The deadline is inherited.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Fire the signal.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The underlying token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once the token has been cancelled. Ignores the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Non-blocking check of both the token and the deadline.
    ///
    /// # Errors
    ///
    /// Returns the [`CancellationError`] describing which one fired.
    /// Explicit cancellation wins if both have.
    pub fn check(&self) -> Result<(), CancellationError> {
        if self.token.is_cancelled() {
            return Err(CancellationError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CancellationError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Wait until the signal fires and report why.
    pub async fn fired(&self) -> CancellationError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.token.cancelled() => CancellationError::Cancelled,
                () = tokio::time::sleep_until(deadline) => CancellationError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancellationError::Cancelled
            }
        }
    }
}

impl From<CancellationToken> for CancellationSignal {
    fn from(token: CancellationToken) -> Self {
        Self::from_token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_signal_passes_check() {
        let signal = CancellationSignal::new().with_timeout(Duration::from_secs(1));
        assert_eq!(signal.check(), Ok(()));
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn test_timeout_without_runtime() {
        let signal = CancellationSignal::new().with_timeout(Duration::from_secs(60));
        assert!(signal.deadline().is_some());
        assert_eq!(signal.check(), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_cancel() {
        let signal = CancellationSignal::new();
        let clone = signal.clone();
        clone.cancel();
        assert_eq!(signal.check(), Err(CancellationError::Cancelled));
        assert_eq!(signal.fired().await, CancellationError::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_reported_as_deadline_exceeded() {
        let signal = CancellationSignal::new().with_timeout(Duration::from_millis(50));
        assert_eq!(signal.fired().await, CancellationError::DeadlineExceeded);
        assert_eq!(signal.check(), Err(CancellationError::DeadlineExceeded));
        // The token itself was never cancelled
        assert!(!signal.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_deadline_wins() {
        let now = Instant::now();
        let signal = CancellationSignal::new()
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(signal.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancels_child_but_not_reverse() {
        let parent = CancellationSignal::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());

        let second = parent.child();
        parent.cancel();
        assert!(second.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_inherits_deadline() {
        let parent = CancellationSignal::new().with_timeout(Duration::from_secs(2));
        let child = parent.child();
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_beats_deadline_when_both_fired() {
        let signal = CancellationSignal::new().with_timeout(Duration::from_millis(1));
        tokio::time::advance(Duration::from_millis(5)).await;
        signal.cancel();
        assert_eq!(signal.check(), Err(CancellationError::Cancelled));
    }
}
