//! Cancellable sleep between attempts.

use super::signal::CancellationSignal;
use crate::error::CancellationError;
use async_trait::async_trait;
use std::time::Duration;

/// Sleep for `duration`, returning early if `signal` fires.
///
/// Exactly one outcome is reported: `Ok(())` when the full duration elapsed,
/// or the [`CancellationError`] naming which part of the signal fired. A
/// signal that has already fired is reported without waiting, even for a
/// zero duration. The timer is dropped on every exit path.
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::{CancellationSignal, sleep};
/// use rebound_core::CancellationError;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let signal = CancellationSignal::new();
/// signal.cancel();
///
/// let result = sleep(&signal, Duration::from_secs(60)).await;
/// assert_eq!(result, Err(CancellationError::Cancelled));
/// # }
/// ```
pub async fn sleep(signal: &CancellationSignal, duration: Duration) -> Result<(), CancellationError> {
    signal.check()?;

    // biased: a signal that fired at the same instant as the timer wins
    tokio::select! {
        biased;
        cause = signal.fired() => Err(cause),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Suspension primitive used by the retry engine between attempts.
///
/// [`TokioSleeper`] is the production implementation; tests can supply a
/// scripted one to drive the engine without real timers.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration` or until `signal` fires.
    ///
    /// # Errors
    ///
    /// Returns the [`CancellationError`] if the signal fired first.
    async fn sleep(
        &self,
        signal: &CancellationSignal,
        duration: Duration,
    ) -> Result<(), CancellationError>;
}

/// [`Sleeper`] backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(
        &self,
        signal: &CancellationSignal,
        duration: Duration,
    ) -> Result<(), CancellationError> {
        sleep(signal, duration).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes() {
        let signal = CancellationSignal::new();
        let start = Instant::now();
        assert_eq!(sleep(&signal, Duration::from_millis(250)).await, Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_cancel() {
        let signal = CancellationSignal::new();
        let canceller = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let result = sleep(&signal, Duration::from_secs(3600)).await;
        assert_eq!(result, Err(CancellationError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_deadline() {
        let signal = CancellationSignal::new().with_timeout(Duration::from_millis(100));
        let err = tokio_test::assert_err!(sleep(&signal, Duration::from_secs(10)).await);
        assert_eq!(err, CancellationError::DeadlineExceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_after_duration_does_not_fire() {
        let signal = CancellationSignal::new().with_timeout(Duration::from_secs(10));
        tokio_test::assert_ok!(sleep(&signal, Duration::from_millis(100)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_zero_duration() {
        let signal = CancellationSignal::new();
        signal.cancel();
        assert_eq!(
            sleep(&signal, Duration::ZERO).await,
            Err(CancellationError::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_delegates() {
        let signal = CancellationSignal::new();
        let sleeper = TokioSleeper;
        assert_eq!(sleeper.sleep(&signal, Duration::from_millis(5)).await, Ok(()));

        signal.cancel();
        assert_eq!(
            sleeper.sleep(&signal, Duration::from_millis(5)).await,
            Err(CancellationError::Cancelled)
        );
    }
}
