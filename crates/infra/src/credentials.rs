//! Email/password verification against directory digests.

use std::sync::Arc;

use tenantgate_auth::{AuthError, CredentialHasher};
use tenantgate_core::{Email, User};

use crate::directory::Directory;
use crate::error::ServiceError;

/// Hash on the blocking pool; Argon2 would otherwise stall the executor.
pub async fn hash_blocking(hasher: &Arc<dyn CredentialHasher>, secret: String) -> Result<String, ServiceError> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.hash(&secret))
        .await
        .map_err(|e| ServiceError::internal(format!("hashing task failed: {e}")))?
        .map_err(ServiceError::from)
}

pub async fn verify_blocking(
    hasher: &Arc<dyn CredentialHasher>,
    secret: String,
    digest: String,
) -> Result<bool, ServiceError> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.verify(&secret, &digest))
        .await
        .map_err(|e| ServiceError::internal(format!("verification task failed: {e}")))?
        .map_err(ServiceError::from)
}

#[derive(Clone)]
pub struct CredentialVerifier {
    directory: Arc<dyn Directory>,
    hasher: Arc<dyn CredentialHasher>,
}

impl CredentialVerifier {
    pub fn new(directory: Arc<dyn Directory>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { directory, hasher }
    }

    pub fn hasher(&self) -> &Arc<dyn CredentialHasher> {
        &self.hasher
    }

    /// Resolve the user owning `email` if `password` matches.
    ///
    /// Unknown email, missing digest and wrong password all fail with
    /// `InvalidCredentials`. The active flag is checked only after the
    /// password matched.
    pub async fn verify(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::InvalidCredentials.into());
        };
        let user = self
            .directory
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let digest = user.password_hash.clone().ok_or(AuthError::InvalidCredentials)?;

        if !verify_blocking(&self.hasher, password.to_string(), digest).await? {
            return Err(AuthError::InvalidCredentials.into());
        }
        if !user.is_active {
            return Err(AuthError::UserInactive.into());
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, PASSWORD};

    #[tokio::test]
    async fn correct_password_resolves_the_user() {
        let fx = Fixture::new().await;
        let user = fx.user("u1@example.com").await;

        let found = fx.credentials().verify("U1@Example.com ", PASSWORD).await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn failures_do_not_reveal_which_part_was_wrong() {
        let fx = Fixture::new().await;
        fx.user("u1@example.com").await;
        let verifier = fx.credentials();

        let wrong_password = verifier.verify("u1@example.com", "nope-nope").await.unwrap_err();
        let unknown_email = verifier.verify("ghost@example.com", PASSWORD).await.unwrap_err();
        let malformed = verifier.verify("not-an-email", PASSWORD).await.unwrap_err();

        assert_eq!(wrong_password, ServiceError::InvalidCredentials);
        assert_eq!(unknown_email, ServiceError::InvalidCredentials);
        assert_eq!(malformed, ServiceError::InvalidCredentials);
    }

    #[tokio::test]
    async fn inactive_users_are_reported_only_after_a_correct_password() {
        let fx = Fixture::new().await;
        let mut user = fx.user("u1@example.com").await;
        user.is_active = false;
        fx.save_user(&user).await;
        let verifier = fx.credentials();

        assert_eq!(verifier.verify("u1@example.com", "wrong-pass").await, Err(ServiceError::InvalidCredentials));
        assert_eq!(verifier.verify("u1@example.com", PASSWORD).await, Err(ServiceError::UserInactive));
    }

    #[tokio::test]
    async fn provider_only_accounts_cannot_use_passwords() {
        let fx = Fixture::new().await;
        let mut user = fx.user("sso@example.com").await;
        user.password_hash = None;
        fx.save_user(&user).await;

        let err = fx.credentials().verify("sso@example.com", PASSWORD).await.unwrap_err();
        assert_eq!(err, ServiceError::InvalidCredentials);
    }
}
