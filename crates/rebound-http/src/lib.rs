//! HTTP retry adapter for `rebound-core`
//!
//! Classifies HTTP outcomes for the retry engine and offers a small
//! `reqwest`-based transport that uses it.
//!
//! # Architecture
//!
//! - **Status classification**: [`StatusRetryPolicy`](http::StatusRetryPolicy)
//!   (504 always retryable, caller allow-list, client errors never)
//! - **Retry adapter**: [`do_with_retry`](http::do_with_retry) over any
//!   response type implementing [`HttpStatus`]
//! - **Per-call options**: [`invoke`](http::invoke) with a
//!   [`Retryer`](http::Retryer)
//! - **HTTP transport**: [`HttpTransport`] via reqwest
//!
//! # Usage
//!
//! ```no_run
//! use rebound_core::retry::{CancellationSignal, RetryConfig};
//! use rebound_http::{HttpRequest, HttpTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new()?;
//! let request = HttpRequest::new("GET", "https://pubsub.example.com/v1/topics");
//! let response = transport
//!     .send_with_retry(
//!         &CancellationSignal::new(),
//!         &RetryConfig::default().with_max_attempts(5),
//!         &request,
//!         &[502, 503],
//!     )
//!     .await?;
//! println!("{}", response.status);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use http::{HttpFailure, HttpTransport, StatusRetryPolicy, do_with_retry};
pub use traits::{HttpRequest, HttpResponse, HttpStatus};
