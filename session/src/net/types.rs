//! Wire and storage DTOs for the member session.
//!
//! DESIGN
//! ======
//! `Session` is both the login response body and the persisted snapshot, so
//! the serde shape here is the storage format. Unknown fields are kept in
//! `extra` maps and written back untouched; the server owns them.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::util::now_ms;

/// Default path prefix for member avatar images.
pub const DEFAULT_AVATAR_BASE: &str = "/api/member";

// =============================================================================
// SESSION
// =============================================================================

/// Authentication session for the current member.
///
/// An empty `token` and empty `user.username` mean "anonymous".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer credential issued by the login endpoint.
    #[serde(default, deserialize_with = "null_as_default")]
    pub token: String,
    /// Identity of the logged-in member.
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: SessionUser,
    /// Epoch milliseconds appended to avatar URLs as a cache buster.
    #[serde(rename = "avatarTimeStamp", default = "now_ms")]
    pub avatar_timestamp: i64,
    /// Server-assigned fields this client does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            token: String::new(),
            user: SessionUser::default(),
            avatar_timestamp: now_ms(),
            extra: Map::new(),
        }
    }
}

impl Session {
    /// True when a member is logged in (non-empty username).
    #[must_use]
    pub fn is_login(&self) -> bool {
        !self.user.username.is_empty()
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.user.username
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.user.email
    }

    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.user.roles
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.user.roles.iter().any(|r| r == role)
    }

    /// Avatar image path for the logged-in member, `None` when anonymous.
    ///
    /// `avatar_base` is the member endpoint prefix (e.g. `/api/member`).
    #[must_use]
    pub fn avatar_url(&self, avatar_base: &str) -> Option<String> {
        if !self.is_login() {
            return None;
        }
        Some(avatar_endpoint(avatar_base, &self.user.username, self.avatar_timestamp))
    }
}

/// Identity block of a [`Session`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    /// Role labels such as `ROLE_MEMBER`. Order carries no meaning.
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub(crate) fn avatar_endpoint(avatar_base: &str, username: &str, timestamp: i64) -> String {
    format!("{}/{username}/avatar?t={timestamp}", avatar_base.trim_end_matches('/'))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Login request body.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Profile fields mirrored into the local session after a server-side update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub email: String,
}

/// Password change request body for `PUT /api/member/{username}/changepassword`.
#[derive(Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub username: String,
    pub old_password: String,
    pub new_password: String,
}

impl std::fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordChange")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Member record returned by the signup and profile update endpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
