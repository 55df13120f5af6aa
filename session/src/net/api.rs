//! Login endpoint client.
//!
//! DESIGN
//! ======
//! `AuthApi` is the seam the session store calls through. `HttpAuthApi`
//! posts credentials to `POST /api/auth/login`; tests substitute an
//! in-process fake.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is an `AuthError` handed back to the caller untouched.
//! Nothing here retries.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use super::types::{Credentials, Session};
use crate::config::{HttpTimeouts, SessionConfig};

pub const LOGIN_PATH: &str = "/api/auth/login";

/// Errors produced by the login endpoint.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("login request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("login rejected: status {status}")]
    Rejected { status: u16, body: String },

    /// A success response whose body is not a session payload.
    #[error("login response parse failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl AuthError {
    /// True when the server explicitly refused the credentials.
    #[must_use]
    pub fn is_bad_credentials(&self) -> bool {
        matches!(self, Self::Rejected { status: 401 | 403, .. })
    }
}

/// Authentication endpoint consumed by the session store.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a full session payload.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if the endpoint rejects the credentials or
    /// cannot be reached.
    async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError>;
}

/// Build a `reqwest` client with the configured timeouts.
///
/// # Errors
///
/// Returns the builder's error message if TLS or the client cannot initialize.
pub fn build_http_client(timeouts: HttpTimeouts) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| e.to_string())
}

/// `reqwest`-backed [`AuthApi`].
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    http: reqwest::Client,
    login_url: String,
}

impl HttpAuthApi {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &SessionConfig) -> Result<Self, AuthError> {
        let http = build_http_client(config.timeouts).map_err(AuthError::HttpClientBuild)?;
        Ok(Self::with_client(http, config))
    }

    /// Reuse an existing client (shares its connection pool).
    #[must_use]
    pub fn with_client(http: reqwest::Client, config: &SessionConfig) -> Self {
        Self { http, login_url: config.endpoint(LOGIN_PATH) }
    }

    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        tracing::debug!(url = %self.login_url, username = %credentials.username, "posting login");

        let response = self
            .http
            .post(&self.login_url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(AuthError::Rejected { status, body: text });
        }

        parse_login_response(&text)
    }
}

pub(crate) fn parse_login_response(json: &str) -> Result<Session, AuthError> {
    serde_json::from_str(json).map_err(|e| AuthError::Decode(e.to_string()))
}
