//! Locally verifiable signed credentials (HS256), the alternative bearer mode.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tenantgate_core::{RoleId, TenantId, UserId};

use crate::{AuthContext, AuthError, Permission, Role};

/// Claims carried by a self-contained signed credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Tenant context for the token.
    pub tenant_id: TenantId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<RoleId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<Role>,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Expiration, unix seconds.
    pub exp: i64,
}

impl SignedClaims {
    pub fn into_context(self) -> AuthContext {
        AuthContext {
            user_id: self.sub,
            tenant_id: self.tenant_id,
            role_id: self.role_id,
            role: self.role_name,
            permissions: self.permissions,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

impl From<TokenValidationError> for AuthError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Expired => AuthError::TokenExpired,
            other => AuthError::TokenInvalid(other.to_string()),
        }
    }
}

/// Deterministically validate the claim time window.
///
/// Signature verification happens before this, in [`Hs256Verifier`].
pub fn validate_claims(claims: &SignedClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Verifies a bearer credential without a store lookup.
pub trait SignedCredentialVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AuthContext, AuthError>;
}

/// HMAC-SHA256 credential verifier.
pub struct Hs256Verifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256Verifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time window is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl SignedCredentialVerifier for Hs256Verifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AuthContext, AuthError> {
        let data = jsonwebtoken::decode::<SignedClaims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::TokenInvalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims.into_context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    fn claims(now: DateTime<Utc>) -> SignedClaims {
        SignedClaims {
            sub: UserId::new(),
            tenant_id: TenantId::new(),
            role_id: Some(RoleId::new()),
            role_name: Some(Role::new("Viewer")),
            permissions: vec![Permission::new("portal:read")],
            iat: now.timestamp(),
            exp: (now + Duration::minutes(10)).timestamp(),
        }
    }

    fn sign(secret: &[u8], claims: &SignedClaims) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_context() {
        let now = Utc::now();
        let c = claims(now);
        let token = sign(b"secret", &c);

        let ctx = Hs256Verifier::new(b"secret").verify(&token, now).unwrap();
        assert_eq!(ctx.user_id, c.sub);
        assert_eq!(ctx.tenant_id, c.tenant_id);
        assert_eq!(ctx.role, c.role_name);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = sign(b"secret", &claims(now));
        let err = Hs256Verifier::new(b"other").verify(&token, now).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = sign(b"secret", &claims(now));
        let later = now + Duration::minutes(11);
        assert_eq!(
            Hs256Verifier::new(b"secret").verify(&token, later),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn time_window_checks() {
        let now = Utc::now();
        let mut c = claims(now);
        assert_eq!(validate_claims(&c, now - Duration::minutes(1)), Err(TokenValidationError::NotYetValid));
        c.exp = c.iat;
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::InvalidTimeWindow));
    }
}
