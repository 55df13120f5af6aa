//! Client-side member authentication session.
//!
//! SYSTEM CONTEXT
//! ==============
//! `state::auth::AuthStore` holds the current session, mirrors it to durable
//! storage (`util::storage`), and logs in through `net::api`. Callers build
//! one store per application and pass it to whatever needs the session.

pub mod config;
pub mod net;
pub mod state;
pub mod util;

pub use config::SessionConfig;
pub use net::api::{AuthApi, AuthError, HttpAuthApi};
pub use net::member::{MemberApi, MemberError};
pub use net::types::{Credentials, MemberProfile, PasswordChange, ProfileUpdate, Session, SessionUser};
pub use state::auth::{AuthStore, SESSION_KEY, StoreError};
pub use util::storage::{FileStorage, MemoryStorage, Storage, StorageError};
