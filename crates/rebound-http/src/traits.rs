//! HTTP request/response types and the status capability used for retry
//! classification.

use std::collections::HashMap;

/// Anything that carries an HTTP status code.
///
/// The retry adapter only needs the status to classify a response, so it is
/// generic over this capability instead of a concrete client's response type.
pub trait HttpStatus {
    /// Numeric status code.
    fn status(&self) -> u16;

    /// Returns true for statuses below 400.
    fn is_success_status(&self) -> bool {
        self.status() < 400
    }
}

impl HttpStatus for reqwest::Response {
    fn status(&self) -> u16 {
        reqwest::Response::status(self).as_u16()
    }
}

impl<B> HttpStatus for http::Response<B> {
    fn status(&self) -> u16 {
        http::Response::status(self).as_u16()
    }
}

impl HttpStatus for http::StatusCode {
    fn status(&self) -> u16 {
        self.as_u16()
    }
}

/// HTTP request specification
///
/// A fully prepared request. It is re-sent verbatim on every attempt, so it
/// must be safe to repeat.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: String,

    /// Request URL
    pub url: String,

    /// Request headers
    pub headers: HashMap<String, String>,

    /// Request body (optional)
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Create a new HTTP request
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Add a header to the request
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request body
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the request body from string
    pub fn with_text_body(mut self, text: impl Into<String>) -> Self {
        self.body = Some(text.into().into_bytes());
        self
    }
}

/// HTTP response
///
/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a new HTTP response
    pub fn new(status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the response body as a string
    pub fn text(&self) -> std::result::Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.clone())
    }

    /// Parse response body as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the response body cannot be parsed as valid JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::error::Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Get a header value by name (case-insensitive)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl HttpStatus for HttpResponse {
    fn status(&self) -> u16 {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::new("POST", "https://pubsub.example.com/v1/publish")
            .with_header("Content-Type", "application/json")
            .with_text_body("{}");

        assert_eq!(request.method, "POST");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.body, Some(b"{}".to_vec()));
    }

    #[test]
    fn test_response_helpers() {
        let mut headers = HashMap::new();
        headers.insert("Retry-After".to_string(), "3".to_string());
        let response = HttpResponse::new(200, headers, br#"{"ok":true}"#.to_vec());

        assert!(response.is_success());
        assert!(response.is_success_status());
        assert_eq!(response.get_header("retry-after"), Some("3"));

        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["ok"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_status_capability() {
        assert_eq!(http::StatusCode::BAD_GATEWAY.status(), 502);
        assert!(!http::StatusCode::NOT_FOUND.is_success_status());

        let response = http::Response::builder().status(304).body(()).unwrap();
        assert!(HttpStatus::is_success_status(&response));
    }
}
