//! Authorization resolution against live directory data.
//!
//! Nothing here caches: every call re-reads memberships, roles and
//! permissions, so admin-gated mutations always see current grants.

use std::sync::Arc;

use serde::Serialize;

use tenantgate_auth::{build_scope, select_membership, AccessLevel, Permission, TenantContextUpdate, TenantSelection};
use tenantgate_core::{Membership, Role, Tenant, TenantId, UserId};

use crate::directory::Directory;
use crate::error::ServiceError;

/// Tenant, role and permissions for one membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    pub membership: Membership,
    pub tenant: Tenant,
    pub role: Role,
    pub permissions: Vec<Permission>,
    pub scope: String,
}

impl ResolvedContext {
    pub fn role_name(&self) -> tenantgate_auth::Role {
        tenantgate_auth::Role::new(self.role.name.clone())
    }

    pub fn summary(&self) -> TenantSummary {
        TenantSummary {
            id: self.tenant.id,
            name: self.tenant.name.clone(),
            slug: self.tenant.slug.as_str().to_string(),
            role: self.role.name.clone(),
        }
    }

    pub fn tenant_update(&self) -> TenantContextUpdate {
        TenantContextUpdate {
            tenant_id: self.tenant.id,
            tenant_slug: self.tenant.slug.as_str().to_string(),
            role_id: Some(self.role.id),
            roles: vec![self.role_name()],
            permissions: self.permissions.clone(),
            scope: self.scope.clone(),
        }
    }
}

/// One entry of a tenant-choice result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantSummary {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedContext),
    /// Several tenants and none requested: the caller must ask the user.
    Choice(Vec<TenantSummary>),
}

#[derive(Clone)]
pub struct AuthorizationResolver {
    directory: Arc<dyn Directory>,
}

impl AuthorizationResolver {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    pub async fn resolve(&self, user_id: UserId, tenant_id: Option<TenantId>) -> Result<Resolution, ServiceError> {
        let memberships = self.directory.memberships_for_user(user_id).await?;
        match select_membership(&memberships, tenant_id)? {
            TenantSelection::Selected(membership) => {
                Ok(Resolution::Resolved(self.load(membership).await?))
            }
            TenantSelection::Choice(candidates) => {
                let mut summaries = Vec::with_capacity(candidates.len());
                for membership in candidates {
                    let tenant = self.tenant(membership.tenant_id).await?;
                    let role = self.role_of(membership).await?;
                    summaries.push(TenantSummary {
                        id: tenant.id,
                        name: tenant.name,
                        slug: tenant.slug.as_str().to_string(),
                        role: role.name,
                    });
                }
                Ok(Resolution::Choice(summaries))
            }
        }
    }

    /// Resolve an explicitly named tenant; never yields a choice.
    pub async fn resolve_in(&self, user_id: UserId, tenant_id: TenantId) -> Result<ResolvedContext, ServiceError> {
        match self.resolve(user_id, Some(tenant_id)).await? {
            Resolution::Resolved(ctx) => Ok(ctx),
            Resolution::Choice(_) => Err(ServiceError::internal("explicit tenant produced a choice")),
        }
    }

    /// Load tenant, role and permissions for one membership.
    pub async fn load(&self, membership: &Membership) -> Result<ResolvedContext, ServiceError> {
        let tenant = self.tenant(membership.tenant_id).await?;
        let role = self.role_of(membership).await?;
        let permissions: Vec<Permission> = self
            .directory
            .permissions_for_role(role.id)
            .await?
            .iter()
            .map(Permission::from)
            .collect();
        let scope = build_scope(&permissions);
        Ok(ResolvedContext {
            membership: membership.clone(),
            tenant,
            role,
            permissions,
            scope,
        })
    }

    /// Check `user_id` holds `level` in `tenant_id`; returns the membership.
    pub async fn require(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        level: AccessLevel,
    ) -> Result<Membership, ServiceError> {
        let membership = self
            .directory
            .memberships_for_user(user_id)
            .await?
            .into_iter()
            .find(|m| m.is_active() && m.tenant_id == tenant_id)
            .ok_or(level.denial(tenant_id))?;

        let role = self.role_of(&membership).await?;
        if !level.permits(&tenantgate_auth::Role::new(role.name)) {
            return Err(level.denial(tenant_id).into());
        }
        Ok(membership)
    }

    async fn tenant(&self, id: TenantId) -> Result<Tenant, ServiceError> {
        self.directory.find_tenant(id).await?.ok_or(ServiceError::NotFound("tenant"))
    }

    async fn role_of(&self, membership: &Membership) -> Result<Role, ServiceError> {
        self.directory
            .find_role(membership.role_id)
            .await?
            .ok_or(ServiceError::NotFound("role"))
    }
}

#[cfg(test)]
mod tests {
    use tenantgate_auth::AuthzError;

    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn single_membership_auto_selects_with_viewer_scope() {
        let fx = Fixture::new().await;
        let user = fx.user("u1@example.com").await;
        let t1 = fx.tenant("Tenant One").await;
        fx.join(user.id, t1.id, "Viewer").await;

        let Resolution::Resolved(ctx) = fx.resolver().resolve(user.id, None).await.unwrap() else {
            panic!("expected a resolved tenant");
        };
        assert_eq!(ctx.tenant.id, t1.id);
        assert_eq!(ctx.role.name, "Viewer");
        assert!(ctx.scope.starts_with("portal:read portal:list portal:export "));
        assert_eq!(ctx.permissions.len(), 13 * 3);
    }

    #[tokio::test]
    async fn two_memberships_without_a_tenant_yield_a_choice() {
        let fx = Fixture::new().await;
        let user = fx.user("u1@example.com").await;
        let a = fx.tenant("Tenant A").await;
        let b = fx.tenant("Tenant B").await;
        fx.join(user.id, a.id, "Viewer").await;
        fx.join(user.id, b.id, "Tenant Owner").await;
        let resolver = fx.resolver();

        let Resolution::Choice(choices) = resolver.resolve(user.id, None).await.unwrap() else {
            panic!("expected a tenant choice");
        };
        let mut ids: Vec<_> = choices.iter().map(|c| c.id).collect();
        ids.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(ids, expected);

        let ctx = resolver.resolve_in(user.id, a.id).await.unwrap();
        assert_eq!(ctx.role.name, "Viewer");
    }

    #[tokio::test]
    async fn foreign_tenant_and_no_memberships_fail_distinctly() {
        let fx = Fixture::new().await;
        let user = fx.user("u1@example.com").await;
        let resolver = fx.resolver();

        assert_eq!(
            resolver.resolve(user.id, None).await,
            Err(ServiceError::Authorization(AuthzError::NoTenantAccess))
        );

        let mine = fx.tenant("Mine").await;
        let theirs = fx.tenant("Theirs").await;
        fx.join(user.id, mine.id, "Viewer").await;
        assert_eq!(
            resolver.resolve(user.id, Some(theirs.id)).await,
            Err(ServiceError::Authorization(AuthzError::TenantAccessDenied(theirs.id)))
        );
    }

    #[tokio::test]
    async fn access_levels_escalate() {
        let fx = Fixture::new().await;
        let tenant = fx.tenant("Acme").await;
        let viewer = fx.user("viewer@example.com").await;
        let admin = fx.user("admin@example.com").await;
        let owner = fx.user("owner@example.com").await;
        let outsider = fx.user("outsider@example.com").await;
        fx.join(viewer.id, tenant.id, "Viewer").await;
        fx.join(admin.id, tenant.id, "Administrator").await;
        fx.join(owner.id, tenant.id, "Tenant Owner").await;
        let resolver = fx.resolver();

        assert!(resolver.require(viewer.id, tenant.id, AccessLevel::Member).await.is_ok());
        assert_eq!(
            resolver.require(viewer.id, tenant.id, AccessLevel::Admin).await,
            Err(ServiceError::Authorization(AuthzError::NotAdmin(tenant.id)))
        );
        assert!(resolver.require(admin.id, tenant.id, AccessLevel::Admin).await.is_ok());
        assert_eq!(
            resolver.require(admin.id, tenant.id, AccessLevel::Owner).await,
            Err(ServiceError::Authorization(AuthzError::NotOwner(tenant.id)))
        );
        assert!(resolver.require(owner.id, tenant.id, AccessLevel::Owner).await.is_ok());
        assert_eq!(
            resolver.require(outsider.id, tenant.id, AccessLevel::Member).await,
            Err(ServiceError::Authorization(AuthzError::NotMember(tenant.id)))
        );
    }
}
