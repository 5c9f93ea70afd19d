//! Tenant administration.
//!
//! Every operation re-derives the requester's standing from the directory
//! before touching anything.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use tenantgate_auth::{AccessLevel, AuthzError, CredentialHasher, Permission};
use tenantgate_core::{
    Email, Membership, MembershipId, Role, RoleId, Tenant, TenantId, User, UserId,
};

use crate::accounts::{check_password_strength, AccountService};
use crate::authorization::AuthorizationResolver;
use crate::credentials::hash_blocking;
use crate::directory::Directory;
use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub user_uuid: Uuid,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub memberships: Vec<MembershipDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipDetail {
    pub membership_id: MembershipId,
    pub tenant_id: TenantId,
    pub tenant_name: String,
    pub tenant_slug: String,
    pub role_id: RoleId,
    pub role_name: String,
    pub permissions: Vec<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantMember {
    pub membership_id: MembershipId,
    pub user_id: UserId,
    pub user_uuid: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub role_id: RoleId,
    pub role_name: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantRole {
    pub role_id: RoleId,
    pub role_name: String,
    pub description: String,
    pub permission_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct TenantAdmin {
    directory: Arc<dyn Directory>,
    resolver: AuthorizationResolver,
    hasher: Arc<dyn CredentialHasher>,
    accounts: AccountService,
}

impl TenantAdmin {
    pub fn new(
        directory: Arc<dyn Directory>,
        resolver: AuthorizationResolver,
        hasher: Arc<dyn CredentialHasher>,
        accounts: AccountService,
    ) -> Self {
        Self {
            directory,
            resolver,
            hasher,
            accounts,
        }
    }

    pub async fn get_user_profile(&self, user_id: UserId) -> Result<UserProfile, ServiceError> {
        let user = self.user(user_id).await?;
        let mut memberships = Vec::new();
        for membership in self.directory.memberships_for_user(user_id).await? {
            let ctx = self.resolver.load(&membership).await?;
            memberships.push(MembershipDetail {
                membership_id: membership.id,
                tenant_id: ctx.tenant.id,
                tenant_name: ctx.tenant.name,
                tenant_slug: ctx.tenant.slug.as_str().to_string(),
                role_id: ctx.role.id,
                role_name: ctx.role.name,
                permissions: ctx.permissions.iter().map(|p| p.as_str().to_string()).collect(),
                joined_at: membership.joined_at,
            });
        }
        Ok(UserProfile {
            user_id: user.id,
            user_uuid: user.identity,
            name: user.name,
            email: user.email.as_str().to_string(),
            is_active: user.is_active,
            is_verified: user.is_verified,
            memberships,
        })
    }

    /// Create an account with no memberships yet.
    pub async fn create_user(&self, name: &str, email: &str, password: &str) -> Result<User, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::validation("name is required"));
        }
        check_password_strength(password)?;
        let email = Email::parse(email)?;
        if self.directory.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("email already registered".into()));
        }

        let digest = hash_blocking(&self.hasher, password.to_string()).await?;
        let user = User::with_password(name.trim(), email, digest);
        let mut tx = self.directory.begin().await?;
        tx.insert_user(&user).await?;
        tx.commit().await?;

        info!(user_id = %user.id, "user created");
        if let Err(err) = self.accounts.send_verification(&user).await {
            warn!(user_id = %user.id, error = %err, "verification link not issued");
        }
        Ok(user)
    }

    pub async fn assign_user_to_tenant(
        &self,
        requester: UserId,
        user_id: UserId,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> Result<Membership, ServiceError> {
        self.resolver.require(requester, tenant_id, AccessLevel::Admin).await?;
        self.user(user_id).await?;
        self.role_in(tenant_id, role_id).await?;

        let mut tx = self.directory.begin().await?;
        if tx.find_membership_for(user_id, tenant_id).await?.is_some() {
            return Err(ServiceError::Conflict("user is already a member of this tenant".into()));
        }
        let membership = Membership::new(user_id, tenant_id, role_id);
        tx.insert_membership(&membership).await?;
        tx.commit().await?;

        info!(%requester, %user_id, %tenant_id, "user assigned to tenant");
        Ok(membership)
    }

    pub async fn remove_user_from_tenant(
        &self,
        requester: UserId,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> Result<(), ServiceError> {
        self.resolver.require(requester, tenant_id, AccessLevel::Admin).await?;
        if requester == user_id {
            return Err(AuthzError::Denied("cannot remove yourself from tenant").into());
        }

        let mut tx = self.directory.begin().await?;
        let membership = tx
            .find_membership_for(user_id, tenant_id)
            .await?
            .ok_or(ServiceError::NotFound("membership"))?;
        tx.delete_membership(membership.id).await?;
        tx.commit().await?;

        info!(%requester, %user_id, %tenant_id, "user removed from tenant");
        Ok(())
    }

    /// Replace the role of an existing membership in place.
    pub async fn update_user_role(
        &self,
        requester: UserId,
        membership_id: MembershipId,
        role_id: RoleId,
    ) -> Result<Membership, ServiceError> {
        let mut membership = self
            .directory
            .find_membership(membership_id)
            .await?
            .ok_or(ServiceError::NotFound("membership"))?;
        self.resolver.require(requester, membership.tenant_id, AccessLevel::Admin).await?;
        self.role_in(membership.tenant_id, role_id).await?;

        let mut tx = self.directory.begin().await?;
        tx.update_membership_role(membership_id, role_id).await?;
        tx.commit().await?;

        membership.role_id = role_id;
        info!(%requester, %membership_id, %role_id, "membership role updated");
        Ok(membership)
    }

    pub async fn get_tenant_members(
        &self,
        requester: UserId,
        tenant_id: TenantId,
    ) -> Result<Vec<TenantMember>, ServiceError> {
        self.resolver.require(requester, tenant_id, AccessLevel::Member).await?;
        let roles = self.directory.roles_for_tenant(tenant_id).await?;

        let mut members = Vec::new();
        for membership in self.directory.memberships_for_tenant(tenant_id).await? {
            let Some(user) = self.directory.find_user(membership.user_id).await? else {
                continue;
            };
            let role_name = roles
                .iter()
                .find(|r| r.id == membership.role_id)
                .map(|r| r.name.clone())
                .unwrap_or_default();
            members.push(TenantMember {
                membership_id: membership.id,
                user_id: user.id,
                user_uuid: user.identity,
                user_name: user.name,
                user_email: user.email.as_str().to_string(),
                role_id: membership.role_id,
                role_name,
                joined_at: membership.joined_at,
            });
        }
        Ok(members)
    }

    pub async fn get_tenant_roles(
        &self,
        requester: UserId,
        tenant_id: TenantId,
        include_permissions: bool,
    ) -> Result<Vec<TenantRole>, ServiceError> {
        self.resolver.require(requester, tenant_id, AccessLevel::Member).await?;

        let mut out = Vec::new();
        for role in self.directory.roles_for_tenant(tenant_id).await? {
            let permissions: Vec<String> = self
                .directory
                .permissions_for_role(role.id)
                .await?
                .iter()
                .map(|p| Permission::from(p).as_str().to_string())
                .collect();
            out.push(TenantRole {
                role_id: role.id,
                role_name: role.name,
                description: role.description,
                permission_count: permissions.len(),
                permissions: include_permissions.then_some(permissions),
            });
        }
        Ok(out)
    }

    /// Owners only. Changes the display name; the slug never changes.
    pub async fn update_tenant(
        &self,
        requester: UserId,
        tenant_id: TenantId,
        name: &str,
    ) -> Result<Tenant, ServiceError> {
        self.resolver.require(requester, tenant_id, AccessLevel::Owner).await?;
        let mut tenant = self
            .directory
            .find_tenant(tenant_id)
            .await?
            .ok_or(ServiceError::NotFound("tenant"))?;
        tenant.rename(name)?;

        let mut tx = self.directory.begin().await?;
        tx.update_tenant(&tenant).await?;
        tx.commit().await?;
        Ok(tenant)
    }

    async fn user(&self, user_id: UserId) -> Result<User, ServiceError> {
        self.directory.find_user(user_id).await?.ok_or(ServiceError::NotFound("user"))
    }

    async fn role_in(&self, tenant_id: TenantId, role_id: RoleId) -> Result<Role, ServiceError> {
        self.directory
            .find_role(role_id)
            .await?
            .filter(|r| r.tenant_id == tenant_id)
            .ok_or_else(|| ServiceError::validation("role not found or does not belong to this tenant"))
    }
}
