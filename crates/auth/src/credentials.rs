//! Password hashing capability.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;

use crate::AuthError;

/// `hash(secret) -> digest`, `verify(secret, digest) -> bool`.
///
/// Implementations are CPU-bound; async callers should run them on a
/// blocking pool.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, AuthError>;

    /// `Ok(false)` on mismatch; `Err` only for a malformed digest.
    fn verify(&self, secret: &str, digest: &str) -> Result<bool, AuthError>;
}

/// Argon2id (PHC string format) with an optional server-side pepper.
///
/// The pepper is prepended to the secret for both hashing and verification.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    pepper: Option<String>,
}

impl Argon2Hasher {
    pub fn new(pepper: Option<String>) -> Self {
        Self { pepper }
    }

    fn peppered(&self, secret: &str) -> Vec<u8> {
        match &self.pepper {
            Some(p) => format!("{p}{secret}").into_bytes(),
            None => secret.as_bytes().to_vec(),
        }
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let mut salt_bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AuthError::Crypto(format!("salt encoding failed: {e}")))?;

        Argon2::default()
            .hash_password(&self.peppered(secret), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))
    }

    fn verify(&self, secret: &str, digest: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

        match Argon2::default().verify_password(&self.peppered(secret), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_matches() {
        let hasher = Argon2Hasher::default();
        let digest = hasher.hash("hunter2!").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("hunter2!", &digest).unwrap());
        assert!(!hasher.verify("wrong", &digest).unwrap());
    }

    #[test]
    fn pepper_is_applied() {
        let peppered = Argon2Hasher::new(Some("pepper!".into()));
        let digest = peppered.hash("hunter2!").unwrap();
        assert!(peppered.verify("hunter2!", &digest).unwrap());
        assert!(!Argon2Hasher::default().verify("hunter2!", &digest).unwrap());
    }

    #[test]
    fn malformed_digest_is_an_error() {
        let err = Argon2Hasher::default().verify("x", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, AuthError::Crypto(_)));
    }
}
