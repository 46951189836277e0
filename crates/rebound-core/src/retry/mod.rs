//! Retry engine, backoff policy, and cancellable sleep.
//!
//! # Key Types
//!
//! - [`BackoffPolicy`] - Exponential pause schedule
//! - [`RetryConfig`] - Backoff policy plus attempt cap
//! - [`CancellationSignal`] - Cancellation token with optional deadline
//! - [`RetryOutcome`] - Stop/continue result of one attempt
//! - [`RetryPredicate`] - Error classifier for attempt functions
//!
//! # Examples
//!
//! ```rust
//! use rebound_core::retry::{run_with_retry, BackoffPolicy, CancellationSignal, RetryConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetryConfig::new(
//!     BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(5), 2.0)?,
//!     3,
//! );
//! let signal = CancellationSignal::new().with_timeout(Duration::from_secs(30));
//!
//! let value = run_with_retry(
//!     &signal,
//!     &config,
//!     || async { Ok::<_, std::io::Error>(42) },
//!     |_: &std::io::Error| true,
//! )
//! .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod policy;
mod predicate;
mod signal;
mod sleep;

pub use config::{RetryConfig, RetrySettings};
pub use engine::{RetryOutcome, run, run_with_retry, run_with_sleeper};
pub use policy::{BackoffPolicy, BackoffPolicyBuilder};
pub use predicate::{AlwaysRetry, NeverRetry, RetryPredicate};
pub use signal::CancellationSignal;
pub use sleep::{Sleeper, TokioSleeper, sleep};
