//! Mock HTTP client for testing.
//!
//! A configurable mock that serves scripted responses or errors per URL and
//! records every request for verification. URL matching is exact first, then
//! by prefix, so one entry can cover a whole endpoint family.

use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::traits::{Headers, HttpClient, HttpError, Query, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET or POST)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Query parameters (GET only)
    pub query: Query,
    /// Request headers
    pub headers: Headers,
    /// Request body (POST only)
    pub body: Option<String>,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a successful response
    Success(Response),
    /// Return an error
    Error(HttpError),
}

/// Mock HTTP client for testing.
///
/// Each URL maps to a queue of responses: every request pops the front entry,
/// and the last entry is replayed once the queue is down to one. This makes
/// scripting "fail once, then succeed" or staged poll progressions trivial.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response for a URL, replacing any queued responses.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(url.to_string(), VecDeque::from([response]));
    }

    /// Queue an additional response for a URL.
    ///
    /// Responses are served in FIFO order; the final one repeats.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.entry(url.to_string()).or_default().push_back(response);
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, method: &str, url: &str, query: Query, headers: &Headers, body: Option<String>) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            query,
            headers: headers.clone(),
            body,
        });
    }

    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let mut responses = self.responses.lock().unwrap();

        let key = if responses.contains_key(url) {
            Some(url.to_string())
        } else {
            responses
                .keys()
                .find(|pattern| url.starts_with(pattern.as_str()))
                .cloned()
        };

        let queue = responses.get_mut(&key?)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn serve(&self, url: &str) -> Result<Response, HttpError> {
        match self.next_response(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(
        &self,
        url: &str,
        headers: &Headers,
        query: &Query,
    ) -> Result<Response, HttpError> {
        self.record("GET", url, query.clone(), headers, None);
        self.serve(url)
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record("POST", url, Vec::new(), headers, Some(body.to_string()));
        self.serve(url)
    }
}
