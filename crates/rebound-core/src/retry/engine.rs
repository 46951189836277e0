//! The retry loop.

use super::config::RetryConfig;
use super::predicate::RetryPredicate;
use super::signal::CancellationSignal;
use super::sleep::{Sleeper, TokioSleeper};
use crate::error::{CancellationError, RetryError};
use std::any::Any;
use std::future::Future;
use tracing::{debug, warn};

/// Result of a single attempt.
///
/// `Done` and `Stop` end the sequence immediately; `Continue` asks for
/// another attempt if the budget and the signal allow it.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T, E> {
    /// The attempt succeeded.
    Done(T),
    /// The attempt failed and must not be retried.
    Stop(E),
    /// The attempt failed (or produced nothing useful) and may be retried.
    ///
    /// The error, if present, is kept as the last observed failure.
    Continue(Option<E>),
}

impl<T, E> RetryOutcome<T, E> {
    /// `Continue` carrying an error.
    pub fn retry(error: E) -> Self {
        Self::Continue(Some(error))
    }

    /// Build an outcome from a result and a stop decision for its error.
    pub fn from_result(result: Result<T, E>, retryable: impl FnOnce(&E) -> bool) -> Self {
        match result {
            Ok(value) => Self::Done(value),
            Err(err) if retryable(&err) => Self::Continue(Some(err)),
            Err(err) => Self::Stop(err),
        }
    }
}

/// Run `attempt` until it stops, the attempt budget runs out, or `signal`
/// fires.
///
/// Attempts are strictly sequential: attempt *n + 1* starts only after
/// attempt *n* has reported its outcome and the backoff pause has fully
/// elapsed. Cancellation is observed before the first attempt and while
/// waiting between attempts; an attempt that is already running is never
/// interrupted.
///
/// # Errors
///
/// - [`RetryError::Attempt`] when an attempt returns [`RetryOutcome::Stop`]
/// - [`RetryError::Exhausted`] when `config.max_attempts()` attempts all asked
///   to continue
/// - [`RetryError::Cancelled`] when the signal fires
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::{run, BackoffPolicy, CancellationSignal, RetryConfig, RetryOutcome};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let policy = BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(10), 2.0)?;
/// let config = RetryConfig::new(policy, 5);
/// let signal = CancellationSignal::new();
///
/// let mut calls = 0;
/// let value = run(&signal, &config, || {
///     calls += 1;
///     let n = calls;
///     async move {
///         if n < 3 {
///             RetryOutcome::retry(std::io::Error::other("transient"))
///         } else {
///             RetryOutcome::Done(n)
///         }
///     }
/// })
/// .await?;
///
/// assert_eq!(value, 3);
/// # Ok(())
/// # }
/// ```
pub async fn run<F, Fut, T, E>(
    signal: &CancellationSignal,
    config: &RetryConfig,
    attempt: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RetryOutcome<T, E>>,
    E: Any,
{
    run_with_sleeper(signal, config, &TokioSleeper, attempt).await
}

/// [`run`] with an explicit [`Sleeper`].
///
/// # Errors
///
/// See [`run`].
pub async fn run_with_sleeper<S, F, Fut, T, E>(
    signal: &CancellationSignal,
    config: &RetryConfig,
    sleeper: &S,
    mut attempt: F,
) -> Result<T, RetryError<E>>
where
    S: Sleeper + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = RetryOutcome<T, E>>,
    E: Any,
{
    if let Err(cause) = signal.check() {
        debug!(%cause, "signal fired before the first attempt");
        return Err(RetryError::Cancelled {
            cause,
            attempts: 0,
            last_error: None,
        });
    }

    let policy = config.policy();
    let max_attempts = config.max_attempts();
    let mut attempts: u32 = 0;
    let mut last_error: Option<E> = None;

    loop {
        attempts = attempts.saturating_add(1);

        match attempt().await {
            RetryOutcome::Done(value) => return Ok(value),
            RetryOutcome::Stop(err) => return Err(RetryError::Attempt(err)),
            RetryOutcome::Continue(err) => {
                // Cancellation is a termination cause, not a retry cause
                if let Some(err) = err
                    && !CancellationError::is_cancellation(&err)
                {
                    last_error = Some(err);
                }
            }
        }

        if let Some(max) = max_attempts
            && attempts >= max
        {
            warn!(attempts, max_attempts = max, "maximum attempts exceeded");
            return Err(RetryError::Exhausted {
                attempts,
                last_error,
            });
        }

        let delay = policy.jittered_pause(attempts);
        debug!(attempt = attempts, delay = ?delay, "attempt failed; backing off");

        if let Err(cause) = sleeper.sleep(signal, delay).await {
            warn!(attempts, %cause, "retry cancelled during backoff");
            return Err(RetryError::Cancelled {
                cause,
                attempts,
                last_error,
            });
        }
    }
}

/// Call `call` until it succeeds or returns an error `predicate` does not
/// consider retryable.
///
/// # Errors
///
/// Non-retryable errors come back as [`RetryError::Attempt`]; budget
/// exhaustion and cancellation as in [`run`].
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::{run_with_retry, CancellationSignal, RetryConfig};
/// use std::io::{Error, ErrorKind};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let result = run_with_retry(
///     &CancellationSignal::new(),
///     &RetryConfig::default(),
///     || async { Err::<(), _>(Error::new(ErrorKind::PermissionDenied, "denied")) },
///     |err: &Error| err.kind() == ErrorKind::TimedOut,
/// )
/// .await;
///
/// assert!(result.unwrap_err().to_string().contains("denied"));
/// # }
/// ```
pub async fn run_with_retry<F, Fut, T, E, P>(
    signal: &CancellationSignal,
    config: &RetryConfig,
    mut call: F,
    predicate: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Any,
    P: RetryPredicate<E>,
{
    let predicate = &predicate;
    run(signal, config, move || {
        let fut = call();
        async move { RetryOutcome::from_result(fut.await, |err| predicate.is_retryable(err)) }
    })
    .await
}
