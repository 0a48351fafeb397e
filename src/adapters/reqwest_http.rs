//! Reqwest-based HTTP client adapter.
//!
//! Production implementation of the [`HttpClient`] trait. The wrapped client
//! is built with redirects disabled so the login 302 reaches the session
//! gateway instead of being followed to the UI landing page.

use async_trait::async_trait;

use crate::traits::{Headers, HttpClient, HttpError, Query, Response};

/// HTTP client implementation using reqwest.
///
/// # Example
///
/// ```ignore
/// use topictail::adapters::ReqwestHttpClient;
/// use topictail::traits::HttpClient;
///
/// let client = ReqwestHttpClient::new();
/// let response = client.get("https://broker.example.com/api/authorization", &Headers::new(), &[]).await?;
/// println!("Status: {}", response.status);
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new client with redirects disabled.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Create a client with a per-request timeout applied.
    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Wrap a custom reqwest client.
    ///
    /// The caller must keep redirects disabled for the login handshake to
    /// work.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Convert a reqwest error to HttpError.
    fn convert_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else if err.is_body() || err.is_decode() {
            HttpError::Io(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    /// Convert reqwest headers to the ordered header list.
    fn convert_headers(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect()
    }

    /// Apply headers to a request builder.
    fn apply_headers(
        builder: reqwest::RequestBuilder,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        let mut builder = builder;
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        builder
    }

    async fn into_response(response: reqwest::Response) -> Result<Response, HttpError> {
        let status = response.status().as_u16();
        let headers = Self::convert_headers(response.headers());
        let body = response.bytes().await.map_err(Self::convert_error)?;
        Ok(Response::with_headers(status, headers, body))
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(
        &self,
        url: &str,
        headers: &Headers,
        query: &Query,
    ) -> Result<Response, HttpError> {
        let mut builder = self.client.get(url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let builder = Self::apply_headers(builder, headers);

        let response = builder.send().await.map_err(Self::convert_error)?;
        Self::into_response(response).await
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        let builder = self.client.post(url).body(body.to_string());
        let builder = Self::apply_headers(builder, headers);

        let response = builder.send().await.map_err(Self::convert_error)?;
        Self::into_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reqwest_http_client_new() {
        let client = ReqwestHttpClient::new();
        let _inner = client.inner();
    }

    #[test]
    fn test_reqwest_http_client_clone() {
        let client = ReqwestHttpClient::new();
        let cloned = client.clone();
        let _ = cloned.inner();
    }

    #[test]
    fn test_convert_headers_preserves_duplicates() {
        let mut header_map = reqwest::header::HeaderMap::new();
        header_map.append(reqwest::header::SET_COOKIE, "SESSION=a".parse().unwrap());
        header_map.append(reqwest::header::SET_COOKIE, "XSRF=b".parse().unwrap());

        let headers = ReqwestHttpClient::convert_headers(&header_map);
        let cookies: Vec<_> = headers
            .iter()
            .filter(|(k, _)| k == "set-cookie")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(cookies, vec!["SESSION=a", "XSRF=b"]);
    }

    #[tokio::test]
    async fn test_get_connection_refused() {
        let client = ReqwestHttpClient::new();
        let result = client
            .get("http://127.0.0.1:59999/test", &Headers::new(), &Vec::new())
            .await;
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(matches!(
                e,
                HttpError::ConnectionFailed(_) | HttpError::Other(_)
            ));
        }
    }

    #[tokio::test]
    async fn test_post_connection_refused() {
        let client = ReqwestHttpClient::new();
        let result = client
            .post("http://127.0.0.1:59999/test", "a=b", &Headers::new())
            .await;
        assert!(result.is_err());
    }
}
