//! Per-call retry options.
//!
//! An alternative to [`do_with_retry`](super::do_with_retry) where each call
//! site decides, through a [`Retryer`], whether to retry and for how long to
//! pause. Calls without a retryer are made exactly once.

use super::retry::{HttpFailure, is_client_error};
use crate::traits::HttpStatus;
use rebound_core::RetryError;
use rebound_core::retry::{BackoffPolicy, CancellationSignal, Sleeper, TokioSleeper};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Controls retries for a single [`invoke`] call.
///
/// A fresh retryer is created per call, so implementations may keep
/// per-sequence state such as an attempt counter.
pub trait Retryer<R, E>: Send {
    /// Returns the pause before the next attempt, or `None` to stop.
    ///
    /// Only called with failures; never with a successful response.
    fn retry(&mut self, failure: &HttpFailure<R, E>) -> Option<Duration>;
}

type RetryerFactory<R, E> = Arc<dyn Fn() -> Box<dyn Retryer<R, E>> + Send + Sync>;

/// Settings resolved from [`CallOption`]s.
pub struct CallSettings<R, E> {
    retry: Option<RetryerFactory<R, E>>,
}

impl<R, E> CallSettings<R, E> {
    /// Settings with no retryer: calls are made once.
    pub fn new() -> Self {
        Self { retry: None }
    }

    /// Apply `option` to these settings.
    pub fn with_option(mut self, option: &impl CallOption<R, E>) -> Self {
        option.resolve(&mut self);
        self
    }

    /// Whether a retryer factory is configured.
    pub fn has_retryer(&self) -> bool {
        self.retry.is_some()
    }

    fn new_retryer(&self) -> Option<Box<dyn Retryer<R, E>>> {
        self.retry.as_ref().map(|factory| factory())
    }
}

impl<R, E> Default for CallSettings<R, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, E> Clone for CallSettings<R, E> {
    fn clone(&self) -> Self {
        Self {
            retry: self.retry.clone(),
        }
    }
}

impl<R, E> fmt::Debug for CallSettings<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSettings")
            .field("retry", &self.retry.is_some())
            .finish()
    }
}

/// Modifies [`CallSettings`].
pub trait CallOption<R, E> {
    /// Apply the option to `settings`.
    fn resolve(&self, settings: &mut CallSettings<R, E>);
}

/// [`CallOption`] installing a retryer factory. See [`with_retry`].
pub struct RetryerOption<R, E> {
    factory: RetryerFactory<R, E>,
}

impl<R, E> CallOption<R, E> for RetryerOption<R, E> {
    fn resolve(&self, settings: &mut CallSettings<R, E>) {
        settings.retry = Some(Arc::clone(&self.factory));
    }
}

/// Option that creates a retryer with `factory` for every call.
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::BackoffPolicy;
/// use rebound_http::http::{CallSettings, StatusCodeRetryer, with_retry};
///
/// let option = with_retry(|| StatusCodeRetryer::new([502, 503], BackoffPolicy::default()));
/// let settings = CallSettings::<http::StatusCode, std::io::Error>::new().with_option(&option);
/// assert!(settings.has_retryer());
/// ```
pub fn with_retry<R, E, T, F>(factory: F) -> RetryerOption<R, E>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: Retryer<R, E> + 'static,
{
    RetryerOption {
        factory: Arc::new(move || Box::new(factory()) as Box<dyn Retryer<R, E>>),
    }
}

/// Retries failing responses whose status is allow-listed, pausing per a
/// [`BackoffPolicy`].
///
/// Client errors (`400..=499`) and transport failures are never retried.
#[derive(Debug, Clone)]
pub struct StatusCodeRetryer {
    statuses: Vec<u16>,
    policy: BackoffPolicy,
    max_retries: Option<u32>,
    retries: u32,
}

impl StatusCodeRetryer {
    /// Retry `statuses` without a retry limit.
    pub fn new(statuses: impl IntoIterator<Item = u16>, policy: BackoffPolicy) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            policy,
            max_retries: None,
            retries: 0,
        }
    }

    /// Stop after `max_retries` retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Retries granted so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    fn is_retryable_status(&self, status: u16) -> bool {
        !is_client_error(status) && self.statuses.contains(&status)
    }
}

impl<R: HttpStatus, E> Retryer<R, E> for StatusCodeRetryer {
    fn retry(&mut self, failure: &HttpFailure<R, E>) -> Option<Duration> {
        let status = failure.status()?;
        if !self.is_retryable_status(status) {
            return None;
        }
        if let Some(max) = self.max_retries
            && self.retries >= max
        {
            return None;
        }
        self.retries += 1;
        Some(self.policy.jittered_pause(self.retries))
    }
}

/// Make `call` until it succeeds, retrying as the configured [`Retryer`]
/// decides.
///
/// - without a retryer the first failure is returned
/// - client errors (`400..=499`) are returned immediately
/// - otherwise the retryer chooses the pause, or stops
///
/// # Errors
///
/// - [`RetryError::Attempt`] with the failure that ended the sequence
/// - [`RetryError::Cancelled`] if `signal` fires before an attempt or during
///   a pause
pub async fn invoke<F, Fut, R, E>(
    signal: &CancellationSignal,
    call: F,
    settings: &CallSettings<R, E>,
) -> Result<R, RetryError<HttpFailure<R, E>>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    R: HttpStatus,
{
    invoke_with_sleeper(signal, &TokioSleeper, call, settings).await
}

/// [`invoke`] with an explicit [`Sleeper`].
///
/// # Errors
///
/// See [`invoke`].
pub async fn invoke_with_sleeper<S, F, Fut, R, E>(
    signal: &CancellationSignal,
    sleeper: &S,
    mut call: F,
    settings: &CallSettings<R, E>,
) -> Result<R, RetryError<HttpFailure<R, E>>>
where
    S: Sleeper + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    R: HttpStatus,
{
    if let Err(cause) = signal.check() {
        return Err(RetryError::Cancelled {
            cause,
            attempts: 0,
            last_error: None,
        });
    }

    let mut retryer: Option<Box<dyn Retryer<R, E>>> = None;
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);

        let failure = match call().await {
            Ok(response) if response.is_success_status() => return Ok(response),
            Ok(response) => HttpFailure::Status(response),
            Err(err) => HttpFailure::Transport(err),
        };

        if !settings.has_retryer() {
            return Err(RetryError::Attempt(failure));
        }
        if let Some(status) = failure.status()
            && is_client_error(status)
        {
            debug!(status, "client error; not retrying");
            return Err(RetryError::Attempt(failure));
        }

        if retryer.is_none() {
            retryer = settings.new_retryer();
        }
        let Some(pause) = retryer.as_mut().and_then(|r| r.retry(&failure)) else {
            return Err(RetryError::Attempt(failure));
        };

        debug!(attempt = attempts, status = failure.status(), delay = ?pause, "call failed; retrying");

        if let Err(cause) = sleeper.sleep(signal, pause).await {
            warn!(attempts, %cause, "call cancelled during backoff");
            return Err(RetryError::Cancelled {
                cause,
                attempts,
                last_error: Some(failure),
            });
        }
    }
}
