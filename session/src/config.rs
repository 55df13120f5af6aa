//! Session client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const STORAGE_DIR: &str = ".member-session";
const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL `{0}`: expected http:// or https://")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Backend origin, without a trailing slash.
    pub base_url: String,
    /// File backing durable storage.
    pub storage_path: PathBuf,
    /// Path prefix (or absolute URL) of the member avatar endpoint.
    pub avatar_base: String,
    pub timeouts: HttpTimeouts,
}

impl SessionConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `MEMBER_BASE_URL`: default `http://localhost:8080`
    /// - `MEMBER_STORAGE_PATH`: default `$HOME/.member-session/storage.json`
    /// - `MEMBER_AVATAR_BASE`: default `/api/member`
    /// - `MEMBER_REQUEST_TIMEOUT_SECS`: default 30
    /// - `MEMBER_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if `MEMBER_BASE_URL` is not an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if `MEMBER_BASE_URL` is not an http(s) URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = normalize_base_url(&lookup("MEMBER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()))?;
        let storage_path = lookup("MEMBER_STORAGE_PATH")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| default_storage_path(lookup("HOME")), PathBuf::from);
        let avatar_base = lookup("MEMBER_AVATAR_BASE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| crate::net::types::DEFAULT_AVATAR_BASE.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let timeouts = HttpTimeouts {
            request_secs: parse_u64(lookup("MEMBER_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(lookup("MEMBER_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { base_url, storage_path, avatar_base, timeouts })
    }

    /// Replace the backend origin.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an http(s) URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Join `path` onto the backend origin.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Absolute avatar prefix, suitable for fetching outside a browser.
    #[must_use]
    pub fn absolute_avatar_base(&self) -> String {
        if self.avatar_base.starts_with("http://") || self.avatar_base.starts_with("https://") {
            self.avatar_base.clone()
        } else {
            self.endpoint(&self.avatar_base)
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            storage_path: default_storage_path(None),
            avatar_base: crate::net::types::DEFAULT_AVATAR_BASE.to_owned(),
            timeouts: HttpTimeouts::default(),
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn default_storage_path(home: Option<String>) -> PathBuf {
    let root = home.filter(|h| !h.is_empty()).map_or_else(|| PathBuf::from("."), PathBuf::from);
    root.join(STORAGE_DIR).join(STORAGE_FILE)
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
