//! Server-side sessions behind phantom tokens, plus single-use tokens for
//! OAuth state, email verification and password reset.
//!
//! All of them live in the shared [`KeyValueStore`](crate::store::KeyValueStore) so
//! any instance of the service can serve any request.

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

pub mod manager;
pub mod oauth_state;
pub mod one_time;

pub use manager::SessionManager;
pub use oauth_state::OAuthStateStore;
pub use one_time::OneTimeTokens;

/// Key namespace for session records.
pub const SESSION_KEY_PREFIX: &str = "session:";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Absent and expired sessions are indistinguishable to callers.
    #[error("session not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("session record could not be (de)serialized: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub ttl: Duration,
    pub oauth_state_ttl: Duration,
    pub verification_ttl: Duration,
    pub password_reset_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            oauth_state_ttl: Duration::from_secs(10 * 60),
            verification_ttl: Duration::from_secs(24 * 60 * 60),
            password_reset_ttl: Duration::from_secs(60 * 60),
        }
    }
}
