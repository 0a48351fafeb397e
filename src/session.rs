//! Session gateway: login and session verification.
//!
//! The broker UI uses form-based guest login. A successful login answers with
//! a 302 carrying exactly two `set-cookie` fragments; both are joined into
//! one cookie header that authenticates every later call. The session is
//! verified immediately against the authorization endpoint. Any deviation is
//! fatal to engine construction and never retried.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::traits::{Headers, HttpClient};

/// Number of `set-cookie` fragments the login redirect must carry.
const EXPECTED_COOKIE_FRAGMENTS: usize = 2;

/// An authenticated broker session.
///
/// Read-only after login; safe to share across concurrent poll sessions.
/// Never persisted.
#[derive(Clone)]
pub struct Credential {
    cookie: String,
    issued_at: DateTime<Utc>,
}

impl Credential {
    /// The cookie header value authenticating requests.
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    /// When the session was issued.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

impl std::fmt::Debug for Credential {
    // Cookie material stays out of logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("cookie", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Performs the login handshake against the broker UI.
pub struct SessionGateway<'a, C: HttpClient> {
    http: &'a C,
    config: &'a EngineConfig,
}

impl<'a, C: HttpClient> SessionGateway<'a, C> {
    pub fn new(http: &'a C, config: &'a EngineConfig) -> Self {
        Self { http, config }
    }

    /// Log in with the configured guest credentials and verify the session.
    pub async fn login(&self) -> EngineResult<Credential> {
        let body = format!(
            "username={}&password={}",
            urlencoding::encode(&self.config.username),
            urlencoding::encode(&self.config.password),
        );
        let mut headers = Headers::new();
        headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );

        let response = self
            .http
            .post(&self.config.login_url(), &body, &headers)
            .await
            .map_err(|err| EngineError::Auth {
                reason: format!("login request failed: {}", err),
            })?;

        if response.status != 302 {
            return Err(EngineError::Auth {
                reason: format!("login returned status {}, expected 302", response.status),
            });
        }

        let fragments = response.header_all("set-cookie");
        if fragments.len() != EXPECTED_COOKIE_FRAGMENTS {
            return Err(EngineError::Auth {
                reason: format!(
                    "login returned {} set-cookie fragments, expected {}",
                    fragments.len(),
                    EXPECTED_COOKIE_FRAGMENTS
                ),
            });
        }

        let credential = Credential {
            cookie: fragments.join("; "),
            issued_at: Utc::now(),
        };
        debug!("login redirect accepted, verifying session");

        self.verify(&credential).await?;
        info!("broker session established");
        Ok(credential)
    }

    /// Check the session against the authorization endpoint: requires 200 and
    /// a JSON content type.
    pub async fn verify(&self, credential: &Credential) -> EngineResult<()> {
        let mut headers = Headers::new();
        headers.insert("cookie".to_string(), credential.cookie().to_string());

        let response = self
            .http
            .get(&self.config.authorization_url(), &headers, &Vec::new())
            .await
            .map_err(|err| EngineError::Auth {
                reason: format!("authorization check failed: {}", err),
            })?;

        if response.status != 200 {
            return Err(EngineError::Auth {
                reason: format!(
                    "authorization check returned status {}, expected 200",
                    response.status
                ),
            });
        }

        let content_type = response.header("content-type").unwrap_or_default();
        if !content_type.starts_with("application/json") {
            return Err(EngineError::Auth {
                reason: format!(
                    "authorization check returned content type {:?}, expected application/json",
                    content_type
                ),
            });
        }

        Ok(())
    }
}
