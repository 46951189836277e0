//! Transport error types

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors raised while executing a single HTTP attempt (no response available)
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request or response timed out
    #[error("Timeout")]
    Timeout,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Generic transport error
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns true for failures that a retry can plausibly fix: timeouts
    /// and connection failures.
    ///
    /// Transport errors are not retried by default. Use
    /// [`transient_retry_policy`](crate::http::transient_retry_policy) or a
    /// custom predicate built on this to opt in.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
