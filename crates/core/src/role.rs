//! Tenant-scoped roles and their permissions.

use serde::{Deserialize, Serialize};

use crate::{PermissionId, RoleId, TenantId};

/// A role owned by exactly one tenant. `(tenant_id, name)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
}

impl Role {
    pub fn new(tenant_id: TenantId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: RoleId::new(),
            tenant_id,
            name: name.into(),
            description: description.into(),
        }
    }

    /// Copy this role by value into another tenant under a fresh id.
    pub fn copy_into(&self, tenant_id: TenantId) -> Self {
        Self {
            id: RoleId::new(),
            tenant_id,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// A `resource:action` grant owned by a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub role_id: RoleId,
    pub resource: String,
    pub action: String,
}

impl Permission {
    pub fn new(role_id: RoleId, resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: PermissionId::new(),
            role_id,
            resource: resource.into(),
            action: action.into(),
        }
    }

    pub fn copy_into(&self, role_id: RoleId) -> Self {
        Self::new(role_id, self.resource.clone(), self.action.clone())
    }

    /// `resource:action`
    pub fn qualified(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_get_fresh_ids() {
        let template = Role::new(TenantId::new(), "Viewer", "read only");
        let tenant = TenantId::new();
        let copy = template.copy_into(tenant);
        assert_ne!(copy.id, template.id);
        assert_eq!(copy.tenant_id, tenant);
        assert_eq!(copy.name, template.name);

        let perm = Permission::new(template.id, "portal", "read");
        let perm_copy = perm.copy_into(copy.id);
        assert_ne!(perm_copy.id, perm.id);
        assert_eq!(perm_copy.qualified(), "portal:read");
    }
}
