//! Account lifecycle: profile and password changes, email verification,
//! password reset, activation status and soft deletion.
//!
//! Deactivation, deletion and password reset end every session the account
//! holds. Verification and reset links are single-use tokens in the shared
//! store.

use std::sync::Arc;

use tracing::{debug, info};

use tenantgate_auth::{AccessLevel, AuthzError, CredentialHasher};
use tenantgate_core::{Email, User, UserId};

use crate::authorization::AuthorizationResolver;
use crate::credentials::{hash_blocking, verify_blocking};
use crate::directory::Directory;
use crate::error::ServiceError;
use crate::notify::{dispatch, Notification, Notifier};
use crate::session::{OneTimeTokens, SessionConfig, SessionManager};
use crate::store::KeyValueStore;

pub const MIN_PASSWORD_LEN: usize = 8;

const VERIFY_KEY_PREFIX: &str = "verify_email:";
const RESET_KEY_PREFIX: &str = "reset_password:";
const LINK_TOKEN_BYTES: usize = 32;

pub(crate) fn check_password_strength(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AccountService {
    directory: Arc<dyn Directory>,
    resolver: AuthorizationResolver,
    hasher: Arc<dyn CredentialHasher>,
    sessions: SessionManager,
    verifications: OneTimeTokens,
    resets: OneTimeTokens,
    notifier: Arc<dyn Notifier>,
}

impl AccountService {
    pub fn new(
        directory: Arc<dyn Directory>,
        resolver: AuthorizationResolver,
        hasher: Arc<dyn CredentialHasher>,
        sessions: SessionManager,
        store: Arc<dyn KeyValueStore>,
        config: SessionConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            directory,
            resolver,
            hasher,
            sessions,
            verifications: OneTimeTokens::new(store.clone(), VERIFY_KEY_PREFIX, LINK_TOKEN_BYTES, config.verification_ttl),
            resets: OneTimeTokens::new(store, RESET_KEY_PREFIX, LINK_TOKEN_BYTES, config.password_reset_ttl),
            notifier,
        }
    }

    pub async fn update_profile(&self, user_id: UserId, name: &str) -> Result<User, ServiceError> {
        let mut user = self.user(user_id).await?;
        user.rename(name)?;
        self.save(&user).await?;
        Ok(user)
    }

    /// The current password must match. Provider-only accounts have none; they
    /// set a first password through a reset link.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        check_password_strength(new_password)?;
        let mut user = self.user(user_id).await?;
        let digest = user
            .password_hash
            .clone()
            .ok_or_else(|| ServiceError::validation("current password does not match"))?;
        if !verify_blocking(&self.hasher, current_password.to_string(), digest).await? {
            return Err(ServiceError::validation("current password does not match"));
        }

        user.set_password_hash(hash_blocking(&self.hasher, new_password.to_string()).await?);
        self.save(&user).await?;
        info!(%user_id, "password changed");
        Ok(())
    }

    /// Send a fresh verification link. Unknown and already verified addresses
    /// succeed silently so the endpoint never reveals which accounts exist.
    pub async fn request_verification(&self, email: &str) -> Result<(), ServiceError> {
        let Some(user) = self.lookup(email).await? else {
            return Ok(());
        };
        if user.is_verified {
            debug!(user_id = %user.id, "verification requested for a verified account");
            return Ok(());
        }
        self.send_verification(&user).await
    }

    pub(crate) async fn send_verification(&self, user: &User) -> Result<(), ServiceError> {
        let token = self.verifications.issue(&user.id.to_string()).await?;
        dispatch(
            &self.notifier,
            Notification::VerificationRequested {
                user_id: user.id,
                email: user.email.as_str().to_string(),
                token,
            },
        );
        Ok(())
    }

    pub async fn verify_email(&self, token: &str) -> Result<User, ServiceError> {
        let mut user = self.redeem(&self.verifications, token).await?;
        user.mark_verified();
        self.save(&user).await?;
        info!(user_id = %user.id, "email verified");
        Ok(user)
    }

    /// Same silence rules as [`request_verification`](Self::request_verification).
    pub async fn request_password_reset(&self, email: &str) -> Result<(), ServiceError> {
        let Some(user) = self.lookup(email).await? else {
            return Ok(());
        };
        let token = self.resets.issue(&user.id.to_string()).await?;
        dispatch(
            &self.notifier,
            Notification::PasswordResetRequested {
                user_id: user.id,
                email: user.email.as_str().to_string(),
                token,
            },
        );
        Ok(())
    }

    /// Set a new password from a reset link and end every existing session.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ServiceError> {
        check_password_strength(new_password)?;
        let mut user = self.redeem(&self.resets, token).await?;
        user.set_password_hash(hash_blocking(&self.hasher, new_password.to_string()).await?);
        self.save(&user).await?;

        let revoked = self.sessions.delete_all_user_sessions(user.id).await?;
        info!(user_id = %user.id, revoked, "password reset");
        Ok(())
    }

    /// Activate or deactivate another account. Deactivation ends its sessions.
    pub async fn change_status(&self, requester: UserId, user_id: UserId, active: bool) -> Result<User, ServiceError> {
        self.require_admin_over(requester, user_id).await?;
        let mut user = self.user(user_id).await?;
        user.set_active(active);
        self.save(&user).await?;

        if active {
            info!(%requester, %user_id, "user activated");
        } else {
            let revoked = self.sessions.delete_all_user_sessions(user_id).await?;
            info!(%requester, %user_id, revoked, "user deactivated");
        }
        Ok(user)
    }

    /// Soft delete. The row stays; the email becomes free again.
    pub async fn delete_user(&self, requester: UserId, user_id: UserId) -> Result<(), ServiceError> {
        self.require_admin_over(requester, user_id).await?;
        let mut user = self.user(user_id).await?;
        user.soft_delete();
        self.save(&user).await?;

        let revoked = self.sessions.delete_all_user_sessions(user_id).await?;
        info!(%requester, %user_id, revoked, "user deleted");
        Ok(())
    }

    /// The requester must administer at least one tenant the target belongs
    /// to, and never acts on their own account.
    async fn require_admin_over(&self, requester: UserId, target: UserId) -> Result<(), ServiceError> {
        if requester == target {
            return Err(AuthzError::Denied("cannot change your own account").into());
        }
        for membership in self.directory.memberships_for_user(target).await? {
            match self.resolver.require(requester, membership.tenant_id, AccessLevel::Admin).await {
                Ok(_) => return Ok(()),
                Err(ServiceError::Authorization(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(AuthzError::Denied("requester administers no tenant of this user").into())
    }

    async fn redeem(&self, tokens: &OneTimeTokens, token: &str) -> Result<User, ServiceError> {
        let invalid = || ServiceError::validation("invalid or expired token");
        let raw = tokens.redeem(token).await?.ok_or_else(invalid)?;
        let user_id: UserId = raw.parse().map_err(|_| invalid())?;
        self.directory.find_user(user_id).await?.ok_or_else(invalid)
    }

    async fn lookup(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        Ok(self.directory.find_user_by_email(&email).await?)
    }

    async fn user(&self, user_id: UserId) -> Result<User, ServiceError> {
        self.directory.find_user(user_id).await?.ok_or(ServiceError::NotFound("user"))
    }

    async fn save(&self, user: &User) -> Result<(), ServiceError> {
        let mut tx = self.directory.begin().await?;
        tx.update_user(user).await?;
        tx.commit().await?;
        Ok(())
    }
}
