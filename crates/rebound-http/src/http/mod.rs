//! HTTP retry adapter and transport
//!
//! - [`do_with_retry`] / [`do_with_retry_using`]: retry any HTTP call,
//!   classifying failures by status
//! - [`invoke`]: per-call retry options with a [`Retryer`]
//! - [`HttpTransport`]: `reqwest` client with retrying send helpers

pub mod client;
pub mod invoke;
pub mod retry;

pub use client::{HttpTransport, HttpTransportConfig, SendError, transient_retry_policy};
pub use invoke::{
    CallOption, CallSettings, Retryer, RetryerOption, StatusCodeRetryer, invoke,
    invoke_with_sleeper, with_retry,
};
pub use retry::{
    ALWAYS_RETRYABLE, HttpFailure, HttpRetryPredicate, StatusRetryPolicy, do_with_retry,
    do_with_retry_using, is_client_error,
};
