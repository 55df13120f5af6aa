//! Auth-session store for the current member.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `AuthStore` lives per application context. Anything that needs to
//! know who is logged in reads its derived views or subscribes to changes;
//! nothing else holds session state.
//!
//! DESIGN
//! ======
//! The session lives inside a `tokio::sync::watch` sender, so every change is
//! pushed to subscribers and reads are cheap snapshots. Each mutation writes
//! storage first and swaps the in-memory value only if that write succeeded,
//! keeping the two copies identical. `login` awaits the network without
//! holding the lock; concurrent logins are last-write-wins.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use tokio::sync::watch;

use crate::net::api::{AuthApi, AuthError};
use crate::net::types::{Credentials, ProfileUpdate, Session};
use crate::util::now_ms;
use crate::util::storage::{self, Storage, StorageError};

/// Storage key holding the serialized session.
pub const SESSION_KEY: &str = "auth";

/// Errors produced by [`AuthStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The login endpoint failed; passed through unchanged.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Durable storage could not be read or written.
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// A stored session exists but is not valid session JSON.
    #[error("stored session is corrupt: {0}")]
    CorruptSession(#[source] StorageError),
}

/// Authentication session store.
pub struct AuthStore<S, A> {
    storage: S,
    api: A,
    avatar_base: String,
    initial: Session,
    state: watch::Sender<Session>,
}

impl<S, A> std::fmt::Debug for AuthStore<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("avatar_base", &self.avatar_base)
            .field("is_login", &self.state.borrow().is_login())
            .finish_non_exhaustive()
    }
}

impl<S: Storage, A: AuthApi> AuthStore<S, A> {
    /// Create the store and restore any persisted session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptSession`] if storage holds an unreadable
    /// session, or [`StoreError::Storage`] if storage itself fails.
    pub fn new(storage: S, api: A, avatar_base: impl Into<String>) -> Result<Self, StoreError> {
        let store = Self::empty(storage, api, avatar_base);
        store.load()?;
        Ok(store)
    }

    /// Create the store without touching storage.
    pub fn empty(storage: S, api: A, avatar_base: impl Into<String>) -> Self {
        let initial = Session::default();
        let (state, _) = watch::channel(initial.clone());
        Self { storage, api, avatar_base: avatar_base.into(), initial, state }
    }

    /// Replace the in-memory session with the persisted one, if any.
    ///
    /// Returns `true` when a stored session was found.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptSession`] if the stored entry or the
    /// storage medium itself does not parse; the in-memory session is left
    /// as it was.
    pub fn load(&self) -> Result<bool, StoreError> {
        let stored = storage::load_json::<Session>(&self.storage, SESSION_KEY).map_err(|e| match e {
            StorageError::Decode { .. } | StorageError::Format { .. } => {
                tracing::warn!(error = %e, "stored session could not be parsed");
                StoreError::CorruptSession(e)
            }
            other => StoreError::Storage(other),
        })?;
        let Some(session) = stored else {
            tracing::debug!("no stored session");
            return Ok(false);
        };
        tracing::debug!(username = %session.username(), "restored stored session");
        self.state.send_replace(session);
        Ok(true)
    }

    /// Authenticate and replace the whole session with the server payload.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Auth`] when the endpoint fails (the current
    /// session is untouched), or [`StoreError::Storage`] when the new session
    /// cannot be persisted (memory is left unchanged too).
    pub async fn login(&self, credentials: &Credentials) -> Result<(), StoreError> {
        let session = self.api.login(credentials).await?;
        let username = session.username().to_owned();
        self.mutate(move |current| *current = session)?;
        tracing::info!(%username, "logged in");
        Ok(())
    }

    /// Wipe all durable storage and reset to the anonymous session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if storage cannot be cleared.
    pub fn logout(&self) -> Result<(), StoreError> {
        self.storage.clear()?;
        let previous = self.state.send_replace(self.initial.clone());
        if previous.is_login() {
            tracing::info!(username = %previous.username(), "logged out");
        }
        Ok(())
    }

    /// Mirror a server-confirmed profile change into the session.
    ///
    /// Only `email` changes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if the session cannot be persisted.
    pub fn change_profile(&self, update: &ProfileUpdate) -> Result<(), StoreError> {
        let email = update.email.clone();
        self.mutate(move |session| session.user.email = email)
    }

    /// Bump the avatar cache-buster to now.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if the session cannot be persisted.
    pub fn update_avatar(&self) -> Result<(), StoreError> {
        self.mutate(|session| session.avatar_timestamp = now_ms().max(session.avatar_timestamp))
    }

    fn mutate<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Session),
    {
        let mut result = Ok(());
        self.state.send_if_modified(|current| {
            let mut next = current.clone();
            apply(&mut next);
            match storage::save_json(&self.storage, SESSION_KEY, &next) {
                Ok(()) => {
                    *current = next;
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "session persist failed");
                    result = Err(StoreError::Storage(e));
                    false
                }
            }
        });
        result
    }
}

impl<S, A> AuthStore<S, A> {
    /// Current bearer token; empty when anonymous.
    #[must_use]
    pub fn token(&self) -> String {
        self.state.borrow().token.clone()
    }

    #[must_use]
    pub fn is_login(&self) -> bool {
        self.state.borrow().is_login()
    }

    #[must_use]
    pub fn username(&self) -> String {
        self.state.borrow().username().to_owned()
    }

    #[must_use]
    pub fn email(&self) -> String {
        self.state.borrow().email().to_owned()
    }

    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        self.state.borrow().roles().to_vec()
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.state.borrow().has_role(role)
    }

    /// Avatar image URL with the cache-buster, `None` when anonymous.
    #[must_use]
    pub fn avatar_url(&self) -> Option<String> {
        self.state.borrow().avatar_url(&self.avatar_base)
    }

    /// `Authorization` header value for authenticated API calls.
    #[must_use]
    pub fn authorization_header(&self) -> Option<String> {
        let session = self.state.borrow();
        if session.is_login() && !session.token.is_empty() {
            Some(format!("Bearer {}", session.token))
        } else {
            None
        }
    }

    /// Owned copy of the current session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// The anonymous session this store resets to on logout.
    #[must_use]
    pub fn initial_session(&self) -> &Session {
        &self.initial
    }

    /// Receive every subsequent session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }
}
