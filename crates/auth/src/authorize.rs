use thiserror::Error;

use tenantgate_core::{Membership, TenantId};

use crate::{AuthContext, Permission, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user has no tenant access")]
    NoTenantAccess,

    #[error("user does not have access to tenant {0}")]
    TenantAccessDenied(TenantId),

    #[error("user is not a member of tenant {0}")]
    NotMember(TenantId),

    #[error("administrator role required in tenant {0}")]
    NotAdmin(TenantId),

    #[error("owner role required in tenant {0}")]
    NotOwner(TenantId),

    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: {0}")]
    Denied(&'static str),
}

/// Authorize a request context for one permission within `tenant_id`.
///
/// - No IO
/// - No panics
/// - `"*"` grants everything
pub fn authorize(
    ctx: &AuthContext,
    tenant_id: TenantId,
    required: &Permission,
) -> Result<(), AuthzError> {
    if ctx.tenant_id != tenant_id {
        return Err(AuthzError::TenantMismatch);
    }
    if ctx.has_permission(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Access levels for tenant management
// ─────────────────────────────────────────────────────────────────────────────

/// Escalating predicates over a user's membership in one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// Any membership in the tenant.
    Member,
    /// Tenant Owner, Administrator or Super Administrator.
    Admin,
    /// Tenant Owner exactly.
    Owner,
}

impl AccessLevel {
    /// Whether a member holding `role` satisfies this level.
    pub fn permits(self, role: &Role) -> bool {
        match self {
            AccessLevel::Member => true,
            AccessLevel::Admin => role.is_admin(),
            AccessLevel::Owner => role.is_owner(),
        }
    }

    pub fn denial(self, tenant_id: TenantId) -> AuthzError {
        match self {
            AccessLevel::Member => AuthzError::NotMember(tenant_id),
            AccessLevel::Admin => AuthzError::NotAdmin(tenant_id),
            AccessLevel::Owner => AuthzError::NotOwner(tenant_id),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tenant selection policy
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of choosing the active tenant at login.
///
/// `Choice` is a valid, non-terminal result: the caller must ask the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantSelection<'a> {
    Selected(&'a Membership),
    Choice(Vec<&'a Membership>),
}

/// Pick the membership to log into.
///
/// - explicit tenant: its membership must exist, else `TenantAccessDenied`
/// - no tenant, one membership: auto-select
/// - no tenant, several: `Choice` listing all of them
///
/// Deleted memberships are ignored.
pub fn select_membership(
    memberships: &[Membership],
    requested: Option<TenantId>,
) -> Result<TenantSelection<'_>, AuthzError> {
    let active: Vec<&Membership> = memberships.iter().filter(|m| m.is_active()).collect();
    if active.is_empty() {
        return Err(AuthzError::NoTenantAccess);
    }

    match requested {
        Some(tenant_id) => active
            .into_iter()
            .find(|m| m.tenant_id == tenant_id)
            .map(TenantSelection::Selected)
            .ok_or(AuthzError::TenantAccessDenied(tenant_id)),
        None if active.len() == 1 => Ok(TenantSelection::Selected(active[0])),
        None => Ok(TenantSelection::Choice(active)),
    }
}
