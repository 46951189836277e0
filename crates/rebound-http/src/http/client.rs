//! HTTP transport client implementation
//!
//! A thin wrapper over a shared `reqwest` client that sends buffered
//! [`HttpRequest`]s, once or with retries.

use super::retry::{HttpFailure, HttpRetryPredicate, StatusRetryPolicy, do_with_retry_using};
use crate::error::{Result, TransportError};
use crate::traits::{HttpRequest, HttpResponse};
use rebound_core::RetryError;
use rebound_core::retry::{CancellationSignal, RetryConfig};
use reqwest::Client as ReqwestClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Failure type of a retried [`HttpTransport`] call.
pub type SendError = RetryError<HttpFailure<HttpResponse, TransportError>>;

/// HTTP transport implementation
///
/// Handles:
/// - Connection pooling
/// - Timeout handling
/// - Retries through [`do_with_retry_using`]
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Arc<ReqwestClient>,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a new HTTP transport with default configuration
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connection`] if the client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Create a new HTTP transport with custom configuration
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connection`] if the client cannot be built.
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            timeout: config.timeout,
        })
    }

    /// Get a reference to the underlying reqwest client
    pub fn reqwest_client(&self) -> Arc<ReqwestClient> {
        self.client.clone()
    }

    /// Request timeout applied to every attempt.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `request` once.
    ///
    /// Any response, including error statuses, is returned as `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if no response was received or its body
    /// could not be read.
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| {
                TransportError::InvalidRequest(format!(
                    "Unsupported HTTP method: {}",
                    request.method
                ))
            })?;

        let mut req = self.client.request(method, &request.url);

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        let response = req.send().await?;

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string(), v.to_string());
            }
        }

        let body = response.bytes().await?.to_vec();
        debug!(status, url = %request.url, "HTTP response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Send `request` with retries, treating `extra_statuses` as retryable
    /// in addition to 504.
    ///
    /// The request is re-sent verbatim on every attempt, so it must be
    /// idempotent.
    ///
    /// # Errors
    ///
    /// See [`do_with_retry`](super::do_with_retry).
    pub async fn send_with_retry(
        &self,
        signal: &CancellationSignal,
        config: &RetryConfig,
        request: &HttpRequest,
        extra_statuses: &[u16],
    ) -> std::result::Result<HttpResponse, SendError> {
        let predicate = StatusRetryPolicy::new(extra_statuses.iter().copied());
        self.send_with_retry_using(signal, config, request, predicate)
            .await
    }

    /// Send `request` with retries decided by `predicate`.
    ///
    /// # Errors
    ///
    /// See [`do_with_retry`](super::do_with_retry).
    pub async fn send_with_retry_using<P>(
        &self,
        signal: &CancellationSignal,
        config: &RetryConfig,
        request: &HttpRequest,
        predicate: P,
    ) -> std::result::Result<HttpResponse, SendError>
    where
        P: HttpRetryPredicate<HttpResponse, TransportError>,
    {
        do_with_retry_using(signal, config, || self.send(request), predicate).await
    }
}

/// Predicate that classifies statuses like [`StatusRetryPolicy`] and also
/// retries transient transport errors (timeouts, connection failures).
///
/// Only use it for idempotent requests.
pub fn transient_retry_policy(
    extra_statuses: &[u16],
) -> impl HttpRetryPredicate<HttpResponse, TransportError> + use<> {
    let policy = StatusRetryPolicy::new(extra_statuses.iter().copied());
    move |outcome: std::result::Result<&HttpResponse, &TransportError>| match outcome {
        Ok(response) => policy.is_retryable_status(response.status),
        Err(err) => err.is_transient(),
    }
}

/// HTTP transport configuration
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            connect_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_creation() {
        let transport = HttpTransport::new().expect("Failed to create transport");
        assert_eq!(transport.timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_http_transport_with_config() {
        let config = HttpTransportConfig {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 5,
        };

        let transport = HttpTransport::with_config(config).expect("Failed to create transport");
        assert_eq!(transport.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_transient_retry_policy() {
        let predicate = transient_retry_policy(&[502]);
        let bad_gateway = HttpResponse::new(502, HashMap::new(), Vec::new());
        let forbidden = HttpResponse::new(403, HashMap::new(), Vec::new());

        assert!(predicate.is_retryable(Ok(&bad_gateway)));
        assert!(!predicate.is_retryable(Ok(&forbidden)));
        assert!(predicate.is_retryable(Err(&TransportError::Timeout)));
        assert!(!predicate.is_retryable(Err(&TransportError::InvalidRequest("bad".into()))));
    }

    #[tokio::test]
    async fn test_invalid_method_rejected() {
        let transport = HttpTransport::new().expect("Failed to create transport");
        let request = HttpRequest::new("GE T", "http://127.0.0.1:1/");

        let err = transport.send(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }
}
