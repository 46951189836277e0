//! HTTP-aware retry on top of the generic engine in `rebound-core`.
//!
//! Retryability is decided from the response status (or the transport error
//! when no response arrived). See [`StatusRetryPolicy`] for the defaults.
//!
//! # Precondition
//!
//! The wrapped call is executed once per attempt. It must be safe to repeat:
//! idempotency is the caller's responsibility and is not checked here.

use crate::traits::HttpStatus;
use rebound_core::retry::{CancellationSignal, RetryConfig, RetryOutcome, run};
use rebound_core::RetryError;
use std::error::Error;
use std::fmt;
use std::future::Future;
use tracing::debug;

/// Status codes that are always retryable: gateway timeout.
///
/// 408 is a client error and falls under the `400..=499` exclusion.
pub const ALWAYS_RETRYABLE: [u16; 1] = [504];

/// Returns true for statuses in the client-error range `400..=499`.
pub fn is_client_error(status: u16) -> bool {
    (400..500).contains(&status)
}

/// A failed HTTP attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpFailure<R, E> {
    /// A response arrived with a status of 400 or above.
    Status(R),
    /// No response: the transport failed.
    Transport(E),
}

impl<R, E> HttpFailure<R, E> {
    /// The failing response, if one arrived.
    pub fn response(&self) -> Option<&R> {
        match self {
            Self::Status(response) => Some(response),
            Self::Transport(_) => None,
        }
    }

    /// Consume and return the failing response, if one arrived.
    pub fn into_response(self) -> Option<R> {
        match self {
            Self::Status(response) => Some(response),
            Self::Transport(_) => None,
        }
    }

    /// The transport error, if no response arrived.
    pub fn transport_error(&self) -> Option<&E> {
        match self {
            Self::Status(_) => None,
            Self::Transport(err) => Some(err),
        }
    }
}

impl<R: HttpStatus, E> HttpFailure<R, E> {
    /// Status of the failing response, if one arrived.
    pub fn status(&self) -> Option<u16> {
        self.response().map(HttpStatus::status)
    }
}

impl<R: HttpStatus, E: fmt::Display> fmt::Display for HttpFailure<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(response) => write!(f, "HTTP status {}", response.status()),
            Self::Transport(err) => write!(f, "{}", err),
        }
    }
}

impl<R, E> Error for HttpFailure<R, E>
where
    R: HttpStatus + fmt::Debug,
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Status(_) => None,
            Self::Transport(err) => Some(err),
        }
    }
}

/// Decides whether a failed HTTP attempt should be retried.
///
/// Receives `Ok(response)` for responses with a status of 400 or above and
/// `Err(error)` when the transport failed. Any
/// `Fn(Result<&R, &E>) -> bool` is a predicate.
pub trait HttpRetryPredicate<R, E> {
    /// Returns true if the attempt should be retried.
    fn is_retryable(&self, outcome: Result<&R, &E>) -> bool;
}

impl<R, E, F> HttpRetryPredicate<R, E> for F
where
    F: Fn(Result<&R, &E>) -> bool,
{
    fn is_retryable(&self, outcome: Result<&R, &E>) -> bool {
        self(outcome)
    }
}

/// Default HTTP retry classification.
///
/// # HTTP Retry Logic
///
/// Retryable:
/// - 504 Gateway Timeout, always
/// - statuses in the caller's allow-list, unless they are client errors
///
/// Never retryable:
/// - any status in `400..=499` (408 included), even if allow-listed:
///   retrying cannot fix a malformed or unauthorized request
/// - transport errors, unless opted in with
///   [`with_transport_retries`](Self::with_transport_retries)
///
/// # Examples
///
/// ```rust
/// use rebound_http::http::StatusRetryPolicy;
///
/// let policy = StatusRetryPolicy::new([502, 503, 404]);
///
/// assert!(policy.is_retryable_status(502));
/// assert!(policy.is_retryable_status(504)); // always
/// assert!(!policy.is_retryable_status(404)); // client error, allow-list ignored
/// assert!(!policy.is_retryable_status(408)); // client error
/// assert!(!policy.is_retryable_status(500)); // not allow-listed
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusRetryPolicy {
    allow_list: Vec<u16>,
    retry_transport_errors: bool,
}

impl StatusRetryPolicy {
    /// Create a policy with additional retryable statuses.
    pub fn new(extra_statuses: impl IntoIterator<Item = u16>) -> Self {
        Self {
            allow_list: extra_statuses.into_iter().collect(),
            retry_transport_errors: false,
        }
    }

    /// Retry transport errors (no response) as well.
    ///
    /// Only enable this for idempotent requests: a transport error can hide a
    /// request the server already processed.
    pub fn with_transport_retries(mut self, enabled: bool) -> Self {
        self.retry_transport_errors = enabled;
        self
    }

    /// The caller-supplied allow-list.
    pub fn allow_list(&self) -> &[u16] {
        &self.allow_list
    }

    /// Classify a status code.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        if is_client_error(status) {
            return false;
        }
        ALWAYS_RETRYABLE.contains(&status) || self.allow_list.contains(&status)
    }
}

impl<R: HttpStatus, E> HttpRetryPredicate<R, E> for StatusRetryPolicy {
    fn is_retryable(&self, outcome: Result<&R, &E>) -> bool {
        match outcome {
            Ok(response) => self.is_retryable_status(response.status()),
            Err(_) => self.retry_transport_errors,
        }
    }
}

/// Execute `perform` with retries, classifying with [`StatusRetryPolicy`]
/// extended by `extra_statuses`.
///
/// Responses below 400 are returned as success. See the module docs for the
/// idempotency precondition.
///
/// # Errors
///
/// - [`RetryError::Attempt`] with the non-retryable response or transport error
/// - [`RetryError::Exhausted`] / [`RetryError::Cancelled`] carrying the last
///   failing response or transport error
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::{BackoffPolicy, CancellationSignal, RetryConfig};
/// use rebound_http::http::do_with_retry;
/// use http::StatusCode;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let policy = BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(5), 2.0)?;
/// let config = RetryConfig::new(policy, 5);
///
/// let mut calls = 0;
/// let status = do_with_retry(
///     &CancellationSignal::new(),
///     &config,
///     || {
///         calls += 1;
///         let status = if calls < 3 { StatusCode::BAD_GATEWAY } else { StatusCode::OK };
///         async move { Ok::<_, std::io::Error>(status) }
///     },
///     &[502],
/// )
/// .await?;
///
/// assert_eq!(status, StatusCode::OK);
/// assert_eq!(calls, 3);
/// # Ok(())
/// # }
/// ```
pub async fn do_with_retry<F, Fut, R, E>(
    signal: &CancellationSignal,
    config: &RetryConfig,
    perform: F,
    extra_statuses: &[u16],
) -> Result<R, RetryError<HttpFailure<R, E>>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    R: HttpStatus + 'static,
    E: 'static,
{
    let predicate = StatusRetryPolicy::new(extra_statuses.iter().copied());
    do_with_retry_using(signal, config, perform, predicate).await
}

/// Execute `perform` with retries, classifying failures with `predicate`.
///
/// # Errors
///
/// See [`do_with_retry`].
pub async fn do_with_retry_using<F, Fut, R, E, P>(
    signal: &CancellationSignal,
    config: &RetryConfig,
    mut perform: F,
    predicate: P,
) -> Result<R, RetryError<HttpFailure<R, E>>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    R: HttpStatus + 'static,
    E: 'static,
    P: HttpRetryPredicate<R, E>,
{
    let predicate = &predicate;
    run(signal, config, move || {
        let attempt = perform();
        async move {
            match attempt.await {
                Ok(response) if response.is_success_status() => RetryOutcome::Done(response),
                Ok(response) => {
                    let retryable = predicate.is_retryable(Ok(&response));
                    debug!(status = response.status(), retryable, "HTTP attempt failed");
                    classify(retryable, HttpFailure::Status(response))
                }
                Err(err) => {
                    let retryable = predicate.is_retryable(Err(&err));
                    debug!(retryable, "HTTP attempt failed without a response");
                    classify(retryable, HttpFailure::Transport(err))
                }
            }
        }
    })
    .await
}

fn classify<T, R, E>(retryable: bool, failure: HttpFailure<R, E>) -> RetryOutcome<T, HttpFailure<R, E>> {
    if retryable {
        RetryOutcome::retry(failure)
    } else {
        RetryOutcome::Stop(failure)
    }
}
