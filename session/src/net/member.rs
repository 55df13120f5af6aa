//! Member endpoint client (signup, profile, password, avatar, username checks).
//!
//! SYSTEM CONTEXT
//! ==============
//! The session store never calls these. Callers confirm a change with the
//! server here, then mirror the result into the store with
//! `change_profile` / `update_avatar`.

#[cfg(test)]
#[path = "member_test.rs"]
mod member_test;

use std::path::Path;

use reqwest::Url;
use reqwest::multipart::{Form, Part};

use super::api::build_http_client;
use super::types::{MemberProfile, PasswordChange};
use crate::config::SessionConfig;

const MEMBER_PATH: &str = "/api/member";

#[derive(Debug, thiserror::Error)]
pub enum MemberError {
    #[error("member request failed: {0}")]
    Request(String),

    #[error("member request rejected: status {status}")]
    Rejected { status: u16, body: String },

    #[error("member response parse failed: {0}")]
    Decode(String),

    #[error("avatar file {path}: {message}")]
    Avatar { path: String, message: String },

    #[error("not logged in")]
    NotLoggedIn,

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    #[error("invalid member endpoint URL {0}")]
    Url(String),
}

/// Bearer-authenticated client for `/api/member/**`.
#[derive(Debug, Clone)]
pub struct MemberApi {
    http: reqwest::Client,
    base_url: String,
}

impl MemberApi {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &SessionConfig) -> Result<Self, MemberError> {
        let http = build_http_client(config.timeouts).map_err(MemberError::HttpClientBuild)?;
        Ok(Self::with_client(http, config))
    }

    #[must_use]
    pub fn with_client(http: reqwest::Client, config: &SessionConfig) -> Self {
        Self { http, base_url: config.endpoint(MEMBER_PATH) }
    }

    /// `GET /api/member/checkusername/{username}`. `true` means the name is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a boolean.
    pub async fn check_username(&self, username: &str) -> Result<bool, MemberError> {
        let url = self.url(&["checkusername", username])?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| MemberError::Request(e.to_string()))?;
        let text = read_success(response).await?;
        parse_json(&text)
    }

    /// `POST /api/member` as multipart form data. Public; the new member is
    /// granted `ROLE_MEMBER`. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns an error if the avatar cannot be read or the server refuses
    /// the signup (for example a taken username).
    pub async fn join(
        &self,
        username: &str,
        password: &str,
        email: &str,
        avatar: Option<&Path>,
    ) -> Result<MemberProfile, MemberError> {
        let form = member_form(username, password, email, avatar).await?;
        let url = self.url(&[])?;
        tracing::debug!(%url, %username, with_avatar = avatar.is_some(), "joining");
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MemberError::Request(e.to_string()))?;
        let text = read_success(response).await?;
        parse_json(&text)
    }

    /// `PUT /api/member/{username}` as multipart form data.
    ///
    /// The server checks `password` against the stored hash before applying
    /// `email` and the optional avatar image.
    ///
    /// # Errors
    ///
    /// Returns an error if `token` is empty, the avatar cannot be read, or the
    /// server refuses the update.
    pub async fn update_profile(
        &self,
        token: &str,
        username: &str,
        password: &str,
        email: &str,
        avatar: Option<&Path>,
    ) -> Result<MemberProfile, MemberError> {
        require_token(token)?;
        let form = member_form(username, password, email, avatar).await?;
        let url = self.url(&[username])?;
        tracing::debug!(%url, with_avatar = avatar.is_some(), "updating member profile");
        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MemberError::Request(e.to_string()))?;
        let text = read_success(response).await?;
        parse_json(&text)
    }

    /// `PUT /api/member/{username}/changepassword`.
    ///
    /// # Errors
    ///
    /// Returns an error if `token` is empty or the server refuses the change.
    pub async fn change_password(&self, token: &str, change: &PasswordChange) -> Result<(), MemberError> {
        require_token(token)?;
        let url = self.url(&[change.username.as_str(), "changepassword"])?;
        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(change)
            .send()
            .await
            .map_err(|e| MemberError::Request(e.to_string()))?;
        read_success(response).await?;
        Ok(())
    }

    /// Download avatar image bytes from an absolute avatar URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers non-2xx.
    pub async fn fetch_avatar(&self, avatar_url: &str) -> Result<Vec<u8>, MemberError> {
        let response = self
            .http
            .get(avatar_url)
            .send()
            .await
            .map_err(|e| MemberError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(MemberError::Rejected { status, body });
        }
        let bytes = response.bytes().await.map_err(|e| MemberError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// `{base}/api/member` plus `segments`, each percent-encoded as one path
    /// segment.
    fn url(&self, segments: &[&str]) -> Result<Url, MemberError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| MemberError::Url(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| MemberError::Url(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn require_token(token: &str) -> Result<(), MemberError> {
    if token.is_empty() {
        return Err(MemberError::NotLoggedIn);
    }
    Ok(())
}

async fn member_form(
    username: &str,
    password: &str,
    email: &str,
    avatar: Option<&Path>,
) -> Result<Form, MemberError> {
    let mut form = Form::new()
        .text("username", username.to_owned())
        .text("password", password.to_owned())
        .text("email", email.to_owned());
    if let Some(path) = avatar {
        form = form.part("avatar", avatar_part(path).await?);
    }
    Ok(form)
}

async fn avatar_part(path: &Path) -> Result<Part, MemberError> {
    let display = path.display().to_string();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| MemberError::Avatar { path: display.clone(), message: e.to_string() })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "avatar.png".to_owned(), |n| n.to_string_lossy().into_owned());
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(avatar_mime(path))
        .map_err(|e| MemberError::Avatar { path: display, message: e.to_string() })
}

pub(crate) fn avatar_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

async fn read_success(response: reqwest::Response) -> Result<String, MemberError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| MemberError::Request(e.to_string()))?;
    if !(200..300).contains(&status) {
        return Err(MemberError::Rejected { status, body: text });
    }
    Ok(text)
}

fn parse_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, MemberError> {
    serde_json::from_str(text).map_err(|e| MemberError::Decode(e.to_string()))
}
