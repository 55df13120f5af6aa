//! Networking modules for the member backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` is the login endpoint the session store depends on, `member` covers
//! the authenticated member endpoints, and `types` defines the shared schema.

pub mod api;
pub mod member;
pub mod types;

#[cfg(test)]
mod test_server;
