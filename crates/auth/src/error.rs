use thiserror::Error;

/// Authentication failures (who are you?).
///
/// Authorization failures (what may you do?) live in [`crate::AuthzError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email, wrong password and missing digest all collapse here.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user account is inactive")]
    UserInactive,

    #[error("authentication required: {0}")]
    Unauthenticated(&'static str),

    #[error("missing user context")]
    MissingUserContext,

    #[error("missing tenant context")]
    MissingTenantContext,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("crypto error: {0}")]
    Crypto(String),
}
