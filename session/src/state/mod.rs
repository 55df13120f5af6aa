//! Client-side session state.

pub mod auth;
