//! Login and session lifecycle operations.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use tenantgate_auth::{AuthError, ReferenceToken, SessionRecord};
use tenantgate_core::{Email, ProviderBinding, TenantId, User, UserId};

use crate::authorization::{AuthorizationResolver, Resolution, ResolvedContext, TenantSummary};
use crate::credentials::CredentialVerifier;
use crate::directory::Directory;
use crate::error::ServiceError;
use crate::session::SessionManager;

pub const TOKEN_TYPE: &str = "Bearer";
const TENANT_CHOICE_MESSAGE: &str = "User has multiple tenants. Please select one.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub identity: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            identity: user.identity,
            email: user.email.as_str().to_string(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginSuccess {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds.
    pub expires_in: u64,
    pub user: UserSummary,
    pub tenant: TenantSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantChoice {
    pub requires_choice: bool,
    pub message: &'static str,
    pub tenants: Vec<TenantSummary>,
}

/// Exactly one of these comes back from a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LoginOutcome {
    Success(LoginSuccess),
    TenantChoice(TenantChoice),
}

/// Identity asserted by an external provider after a code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: String,
    pub provider_id: String,
    pub email: String,
    pub name: String,
}

#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn Directory>,
    credentials: CredentialVerifier,
    resolver: AuthorizationResolver,
    sessions: SessionManager,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn Directory>,
        credentials: CredentialVerifier,
        resolver: AuthorizationResolver,
        sessions: SessionManager,
    ) -> Self {
        Self {
            directory,
            credentials,
            resolver,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<LoginOutcome, ServiceError> {
        let user = self.credentials.verify(email, password).await?;
        self.login_user(&user, tenant_id).await
    }

    /// Second step after a tenant choice: re-authenticate into one tenant.
    pub async fn select_tenant(
        &self,
        email: &str,
        password: &str,
        tenant_id: TenantId,
    ) -> Result<LoginSuccess, ServiceError> {
        let user = self.credentials.verify(email, password).await?;
        let ctx = self.resolver.resolve_in(user.id, tenant_id).await?;
        self.open_session(&user, ctx).await
    }

    /// Retarget an existing session at another of the user's tenants.
    pub async fn switch_tenant(
        &self,
        token: &ReferenceToken,
        tenant_id: TenantId,
    ) -> Result<SessionRecord, ServiceError> {
        let session = self.sessions.get_session(token).await?;
        let ctx = self.resolver.resolve_in(session.user_id, tenant_id).await?;
        let updated = self.sessions.update_tenant_context(token, ctx.tenant_update()).await?;
        info!(user_id = %updated.user_id, tenant_id = %updated.tenant_id, "session switched tenant");
        Ok(updated)
    }

    pub async fn logout(&self, token: &ReferenceToken) -> Result<(), ServiceError> {
        Ok(self.sessions.delete_session(token).await?)
    }

    pub async fn refresh(&self, token: &ReferenceToken) -> Result<SessionRecord, ServiceError> {
        Ok(self.sessions.refresh_session(token).await?)
    }

    pub async fn session_context(&self, token: &ReferenceToken) -> Result<SessionRecord, ServiceError> {
        Ok(self.sessions.get_session(token).await?)
    }

    pub async fn revoke_all(&self, user_id: UserId) -> Result<usize, ServiceError> {
        let revoked = self.sessions.delete_all_user_sessions(user_id).await?;
        info!(%user_id, revoked, "all sessions revoked");
        Ok(revoked)
    }

    /// Login for a provider-asserted identity.
    ///
    /// Resolution order: existing provider binding, then an account with the
    /// same email (linked on first use), then a fresh provider-only account.
    /// A new account has no memberships, so the login itself ends in
    /// `NoTenantAccess` until someone assigns it a tenant.
    pub async fn login_external(
        &self,
        identity: ExternalIdentity,
        tenant_id: Option<TenantId>,
    ) -> Result<LoginOutcome, ServiceError> {
        let user = match self
            .directory
            .find_user_by_provider(&identity.provider, &identity.provider_id)
            .await?
        {
            Some(user) => user,
            None => self.link_or_create(identity).await?,
        };
        if !user.is_active {
            return Err(AuthError::UserInactive.into());
        }
        self.login_user(&user, tenant_id).await
    }

    async fn link_or_create(&self, identity: ExternalIdentity) -> Result<User, ServiceError> {
        let email = Email::parse(&identity.email).map_err(|_| AuthError::InvalidCredentials)?;
        let binding = ProviderBinding {
            provider: identity.provider,
            provider_id: identity.provider_id,
        };

        let mut tx = self.directory.begin().await?;
        let user = match tx.find_user_by_email(&email).await? {
            Some(mut user) => {
                user.link_provider(binding);
                tx.update_user(&user).await?;
                info!(user_id = %user.id, "external identity linked");
                user
            }
            None => {
                let user = User::from_provider(display_name(&identity.name, &email), email, binding);
                tx.insert_user(&user).await?;
                info!(user_id = %user.id, "user created from external identity");
                user
            }
        };
        tx.commit().await?;
        Ok(user)
    }

    async fn login_user(&self, user: &User, tenant_id: Option<TenantId>) -> Result<LoginOutcome, ServiceError> {
        match self.resolver.resolve(user.id, tenant_id).await? {
            Resolution::Resolved(ctx) => Ok(LoginOutcome::Success(self.open_session(user, ctx).await?)),
            Resolution::Choice(tenants) => Ok(LoginOutcome::TenantChoice(TenantChoice {
                requires_choice: true,
                message: TENANT_CHOICE_MESSAGE,
                tenants,
            })),
        }
    }

    async fn open_session(&self, user: &User, ctx: ResolvedContext) -> Result<LoginSuccess, ServiceError> {
        let record = SessionRecord {
            user_id: user.id,
            user_identity: user.identity,
            tenant_id: ctx.tenant.id,
            tenant_slug: ctx.tenant.slug.as_str().to_string(),
            role_id: Some(ctx.role.id),
            roles: vec![ctx.role_name()],
            permissions: ctx.permissions.clone(),
            scope: ctx.scope.clone(),
            email: user.email.as_str().to_string(),
            name: user.name.clone(),
            issued_at: 0,
            expires_at: 0,
        };
        let token = self.sessions.create_session(record).await?;
        info!(user_id = %user.id, tenant_id = %ctx.tenant.id, token = token.redacted(), "login succeeded");

        Ok(LoginSuccess {
            access_token: token.as_str().to_string(),
            token_type: TOKEN_TYPE,
            expires_in: self.sessions.ttl().as_secs(),
            user: UserSummary::from(user),
            tenant: ctx.summary(),
        })
    }
}

/// Providers may omit the display name; fall back to the email's local part.
fn display_name(name: &str, email: &Email) -> String {
    match name.trim() {
        "" => email.as_str().split('@').next().unwrap_or_default().to_string(),
        trimmed => trimmed.to_string(),
    }
}
