//! Utility helpers shared across session modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! `storage` isolates the durable key-value facility from the store so the
//! store logic can be exercised against an in-memory backend.

pub mod storage;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}
