#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Retry-with-backoff engine.
//!
//! Wraps fallible operations (network calls, API invocations, message
//! delivery) with re-attempt logic governed by:
//!
//! - **An exponential backoff schedule** via [`BackoffPolicy`](retry::BackoffPolicy)
//! - **An optional attempt cap** via [`RetryConfig`](retry::RetryConfig)
//! - **Cooperative cancellation** via [`CancellationSignal`](retry::CancellationSignal)
//! - **Caller-supplied retryability** via [`RetryPredicate`](retry::RetryPredicate)
//!
//! Every retry sequence ends in a single value: the successful result, or a
//! [`RetryError`] saying why retrying stopped and what the last failure was.
//!
//! # Examples
//!
//! Using the prelude for convenient imports:
//!
//! ```rust
//! use rebound_core::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let signal = CancellationSignal::new();
//! let config = RetryConfig::default().with_max_attempts(3);
//!
//! let result: Result<u32, RetryError<&str>> =
//!     run(&signal, &config, || async { RetryOutcome::Done(7) }).await;
//! assert_eq!(result, Ok(7));
//! # }
//! ```

pub mod error;
pub mod retry;

pub use error::{CancellationError, ConfigError, RetryError};

/// Convenient re-exports of commonly used items.
///
/// Import all core abstractions with:
///
/// ```rust
/// use rebound_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{CancellationError, ConfigError, RetryError};
    pub use crate::retry::{
        BackoffPolicy, CancellationSignal, RetryConfig, RetryOutcome, RetryPredicate,
        RetrySettings, run, run_with_retry,
    };
}
