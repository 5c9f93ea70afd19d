use tenantgate_auth::{AuthContext, Permission, ReferenceToken, Role, SessionRecord};
use tenantgate_core::{RoleId, TenantId, UserId};

/// Tenant context for a request.
///
/// This is immutable and must be present for all tenant-scoped routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Principal context for a request, whichever authenticator produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    auth: AuthContext,
}

impl PrincipalContext {
    pub fn new(auth: AuthContext) -> Self {
        Self { auth }
    }

    pub fn user_id(&self) -> UserId {
        self.auth.user_id
    }

    pub fn role_id(&self) -> Option<RoleId> {
        self.auth.role_id
    }

    pub fn role(&self) -> Option<&Role> {
        self.auth.role.as_ref()
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.auth.permissions
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }
}

/// The live session behind a phantom token, for session-management routes.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub token: ReferenceToken,
    pub record: SessionRecord,
}
