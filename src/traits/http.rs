//! HTTP client trait abstraction.
//!
//! The engine consumes HTTP as a narrow capability: one GET with query
//! parameters and one POST with a raw body. This trait is the seam that lets
//! tests substitute a scripted client for the production reqwest adapter.
//!
//! No retry logic lives here; retrying is the polling orchestrator's job.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

/// Request headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// Query parameters in the order they should appear on the URL.
pub type Query = Vec<(String, String)>;

/// HTTP response wrapper.
///
/// Response headers are kept as an ordered list rather than a map because the
/// broker's login endpoint answers with two `set-cookie` headers that must
/// both be observed.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers in arrival order, names lowercased
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a new response without headers.
    pub fn new(status: u16, body: Bytes) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    /// Create a new response with headers.
    pub fn with_headers(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a header, in arrival order.
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Get the response body as a string.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }

    /// Parse the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP client errors.
#[derive(Debug, Clone)]
pub enum HttpError {
    /// Connection failed
    ConnectionFailed(String),
    /// Request timeout
    Timeout(String),
    /// IO error while reading the body
    Io(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::Io(msg) => write!(f, "IO error: {}", msg),
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for HTTP client operations.
///
/// Implementations must NOT follow redirects: the broker's login endpoint
/// answers with a 302 that the session gateway inspects directly.
///
/// # Example
///
/// ```ignore
/// use topictail::traits::{Headers, HttpClient, HttpError};
///
/// async fn probe<C: HttpClient>(client: &C) -> Result<u16, HttpError> {
///     let response = client
///         .get("https://broker.example.com/api/authorization", &Headers::new(), &[])
///         .await?;
///     Ok(response.status)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request with query parameters.
    async fn get(
        &self,
        url: &str,
        headers: &Headers,
        query: &Query,
    ) -> Result<Response, HttpError>;

    /// Perform a POST request with a pre-encoded body.
    ///
    /// The caller is responsible for setting `Content-Type` to match the
    /// body encoding.
    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError>;
}
