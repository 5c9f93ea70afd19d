//! Unified service error taxonomy.
//!
//! Every lower-layer error converts into [`ServiceError`]; the HTTP layer maps
//! each variant to one status class.

use thiserror::Error;

use tenantgate_auth::{AuthError, AuthzError};
use tenantgate_core::DomainError;

use crate::directory::DirectoryError;
use crate::provisioning::consumer::ConsumerRegistryError;
use crate::session::SessionError;
use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Bad input shape. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("authentication required: {0}")]
    Unauthenticated(String),

    /// Unknown user and wrong password are indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user account is inactive")]
    UserInactive,

    #[error(transparent)]
    Authorization(#[from] AuthzError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Session store or directory failed or timed out. Safe to retry.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Consumer registry or identity provider failed or timed out. Safe to retry.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("session or token has expired")]
    Expired,

    #[error("invalid or expired oauth state")]
    InvalidOAuthState,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<AuthError> for ServiceError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => ServiceError::InvalidCredentials,
            AuthError::UserInactive => ServiceError::UserInactive,
            AuthError::Unauthenticated(msg) => ServiceError::Unauthenticated(msg.to_string()),
            AuthError::MissingUserContext => ServiceError::Unauthenticated("missing user context".into()),
            AuthError::MissingTenantContext => {
                ServiceError::Unauthenticated("missing tenant context".into())
            }
            AuthError::BadRequest(msg) => ServiceError::BadRequest(msg),
            AuthError::TokenExpired => ServiceError::Expired,
            AuthError::TokenInvalid(msg) => ServiceError::Unauthenticated(msg),
            AuthError::Crypto(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::Internal(msg),
            DomainError::InvalidId(msg) => ServiceError::BadRequest(msg),
            DomainError::NotFound(what) => ServiceError::NotFound(what),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        ServiceError::StorageUnavailable(value.to_string())
    }
}

impl From<DirectoryError> for ServiceError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::NotFound(what) => ServiceError::NotFound(what),
            DirectoryError::Conflict(msg) => ServiceError::Conflict(msg),
            DirectoryError::Corrupt(msg) => ServiceError::Internal(msg),
            other @ (DirectoryError::Unavailable(_) | DirectoryError::Timeout { .. }) => {
                ServiceError::StorageUnavailable(other.to_string())
            }
        }
    }
}

impl From<SessionError> for ServiceError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::NotFound => ServiceError::NotFound("session"),
            SessionError::Storage(err) => err.into(),
            SessionError::Serialization(msg) => ServiceError::Internal(msg),
        }
    }
}

/// A 409 from the gateway means the consumer already exists; anything else
/// is treated as a transient upstream failure.
impl From<ConsumerRegistryError> for ServiceError {
    fn from(value: ConsumerRegistryError) -> Self {
        match value {
            ConsumerRegistryError::Rejected { status: 409, message } => {
                ServiceError::Conflict(format!("gateway consumer already exists: {message}"))
            }
            other => ServiceError::UpstreamUnavailable(other.to_string()),
        }
    }
}
