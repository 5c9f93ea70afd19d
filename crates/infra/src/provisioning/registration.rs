//! Registration with tenant: one directory transaction plus one external
//! side effect (the gateway consumer) compensated by hand.
//!
//! ```text
//! Validating -> SlugResolved -> UserCreated -> TenantCreated -> RolesCopied
//!   -> OwnerRoleResolved -> MembershipCreated -> ConsumerRegistered
//!   -> Committed | RolledBack
//! ```
//!
//! If the commit fails after the consumer was registered, the consumer is
//! deleted. That deletion can itself fail; it is then logged as
//! `reconciliation_debt` and the original commit error is returned.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tenantgate_auth::roles::TENANT_OWNER;
use tenantgate_auth::CredentialHasher;
use tenantgate_core::{Email, Membership, Role, Tenant, TenantId, TenantSlug, User, UserId};

use super::consumer::{ConsumerRegistry, ConsumerRegistryError, ConsumerRequest, GatewayConsumer};
use crate::accounts::check_password_strength;
use crate::credentials::hash_blocking;
use crate::directory::{Directory, DirectoryTx};
use crate::error::ServiceError;
use crate::notify::{dispatch, Notification, Notifier};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub company_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredTenant {
    pub user_id: UserId,
    pub user_uuid: Uuid,
    pub email: String,
    pub name: String,
    pub tenant_id: TenantId,
    pub tenant_name: String,
    pub tenant_slug: String,
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Validating,
    SlugResolved,
    UserCreated,
    TenantCreated,
    RolesCopied,
    OwnerRoleResolved,
    MembershipCreated,
    ConsumerRegistered,
    Committed,
    RolledBack,
}

/// Failure of the compensating action. Kept apart from [`ServiceError`]:
/// the caller already has the error that triggered compensation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompensationError {
    #[error("gateway consumer {consumer_id} could not be deleted: {source}")]
    ConsumerNotDeleted {
        consumer_id: String,
        #[source]
        source: ConsumerRegistryError,
    },
}

#[derive(Clone)]
pub struct RegistrationSaga {
    directory: Arc<dyn Directory>,
    registry: Arc<dyn ConsumerRegistry>,
    hasher: Arc<dyn CredentialHasher>,
    notifier: Arc<dyn Notifier>,
}

struct Provisioned {
    user: User,
    tenant: Tenant,
    owner_role: Role,
    consumer: GatewayConsumer,
}

impl RegistrationSaga {
    pub fn new(
        directory: Arc<dyn Directory>,
        registry: Arc<dyn ConsumerRegistry>,
        hasher: Arc<dyn CredentialHasher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            directory,
            registry,
            hasher,
            notifier,
        }
    }

    pub async fn register(&self, input: Registration) -> Result<RegisteredTenant, ServiceError> {
        let mut state = RegistrationState::Validating;
        let email = validate(&input)?;
        if self.directory.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("email already registered".into()));
        }

        let slug = self.resolve_slug(&input.company_name).await?;
        advance(&mut state, RegistrationState::SlugResolved);

        let digest = hash_blocking(&self.hasher, input.password.clone()).await?;

        let mut tx = self.directory.begin().await?;
        let provisioned = match self.provision(tx.as_mut(), &input, email, slug, digest, &mut state).await {
            Ok(p) => p,
            Err(err) => {
                drop(tx);
                advance(&mut state, RegistrationState::RolledBack);
                warn!(error = %err, "registration rolled back");
                return Err(err);
            }
        };

        if let Err(err) = tx.commit().await {
            advance(&mut state, RegistrationState::RolledBack);
            warn!(error = %err, "registration commit failed; compensating");
            if let Err(debt) = self.compensate(&provisioned.consumer).await {
                error!(
                    target: "tenantgate::reconciliation",
                    event = "reconciliation_debt",
                    user_identity = %provisioned.user.identity,
                    tenant_slug = %provisioned.tenant.slug,
                    error = %debt,
                    "orphaned gateway consumer needs manual cleanup"
                );
            }
            return Err(err.into());
        }
        advance(&mut state, RegistrationState::Committed);

        let Provisioned { user, tenant, owner_role, .. } = provisioned;
        info!(user_id = %user.id, tenant_id = %tenant.id, slug = %tenant.slug, "tenant registered");
        dispatch(
            &self.notifier,
            Notification::Welcome {
                user_id: user.id,
                email: user.email.as_str().to_string(),
                tenant_name: tenant.name.clone(),
            },
        );

        Ok(RegisteredTenant {
            user_id: user.id,
            user_uuid: user.identity,
            email: user.email.as_str().to_string(),
            name: user.name,
            tenant_id: tenant.id,
            tenant_name: tenant.name,
            tenant_slug: tenant.slug.as_str().to_string(),
            role: owner_role.name,
        })
    }

    /// Derived slug, or the slug plus a unix-timestamp suffix when taken.
    async fn resolve_slug(&self, company_name: &str) -> Result<TenantSlug, ServiceError> {
        let base = TenantSlug::derive(company_name)?;
        if !self.directory.tenant_slug_exists(&base).await? {
            return Ok(base);
        }
        let mut stamp = chrono::Utc::now().timestamp();
        loop {
            let candidate = base.with_suffix(stamp);
            if !self.directory.tenant_slug_exists(&candidate).await? {
                debug!(base = %base, slug = %candidate, "slug collision resolved");
                return Ok(candidate);
            }
            stamp += 1;
        }
    }

    async fn provision(
        &self,
        tx: &mut dyn DirectoryTx,
        input: &Registration,
        email: Email,
        slug: TenantSlug,
        digest: String,
        state: &mut RegistrationState,
    ) -> Result<Provisioned, ServiceError> {
        let user = User::with_password(input.name.trim(), email, digest);
        tx.insert_user(&user).await?;
        advance(state, RegistrationState::UserCreated);

        let tenant = Tenant::new(input.company_name.trim(), slug);
        tx.insert_tenant(&tenant).await?;
        advance(state, RegistrationState::TenantCreated);

        let roles = copy_role_templates(tx, tenant.id).await?;
        advance(state, RegistrationState::RolesCopied);

        let owner_role = roles
            .into_iter()
            .find(|r| r.name == TENANT_OWNER)
            .ok_or_else(|| ServiceError::internal("role templates have no Tenant Owner"))?;
        advance(state, RegistrationState::OwnerRoleResolved);

        tx.insert_membership(&Membership::new(user.id, tenant.id, owner_role.id)).await?;
        advance(state, RegistrationState::MembershipCreated);

        let request = ConsumerRequest::for_portal_user(&user.identity, &user.id, tenant.slug.as_str());
        let consumer = self.registry.create_consumer(&request).await?;
        advance(state, RegistrationState::ConsumerRegistered);

        Ok(Provisioned {
            user,
            tenant,
            owner_role,
            consumer,
        })
    }

    async fn compensate(&self, consumer: &GatewayConsumer) -> Result<(), CompensationError> {
        self.registry
            .delete_consumer(&consumer.id)
            .await
            .map_err(|source| CompensationError::ConsumerNotDeleted {
                consumer_id: consumer.id.clone(),
                source,
            })
    }
}

fn advance(state: &mut RegistrationState, next: RegistrationState) {
    debug!(from = ?*state, to = ?next, "registration state");
    *state = next;
}

fn validate(input: &Registration) -> Result<Email, ServiceError> {
    let required = [
        ("name", &input.name),
        ("email", &input.email),
        ("password", &input.password),
        ("company_name", &input.company_name),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(ServiceError::validation(format!("{field} is required")));
    }
    check_password_strength(&input.password)?;
    Ok(Email::parse(&input.email)?)
}

/// Deep-copy every system role template, with its permissions, into
/// `tenant_id`. Fails when the system tenant or its templates are missing.
pub async fn copy_role_templates(tx: &mut dyn DirectoryTx, tenant_id: TenantId) -> Result<Vec<Role>, ServiceError> {
    let system = tx
        .find_tenant_by_slug(&TenantSlug::system())
        .await?
        .ok_or_else(|| ServiceError::internal("system tenant is not seeded"))?;
    let templates = tx.roles_for_tenant(system.id).await?;
    if templates.is_empty() {
        return Err(ServiceError::internal("system tenant has no role templates"));
    }

    let mut copies = Vec::with_capacity(templates.len());
    for template in &templates {
        let copy = template.copy_into(tenant_id);
        tx.insert_role(&copy).await?;
        for permission in tx.permissions_for_role(template.id).await? {
            tx.insert_permission(&permission.copy_into(copy.id)).await?;
        }
        copies.push(copy);
    }
    Ok(copies)
}
