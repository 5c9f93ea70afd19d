//! System tenant and role templates.
//!
//! Every new tenant receives a deep copy of these roles at registration.

use tracing::info;

use tenantgate_auth::roles::{ADMINISTRATOR, SUPER_ADMINISTRATOR, TENANT_OWNER};
use tenantgate_core::{Permission, Role, Tenant, TenantSlug};

use crate::directory::Directory;
use crate::error::ServiceError;

pub const RESOURCES: &[&str] = &[
    "portal",
    "erp.accounts_receivable",
    "erp.general_ledger",
    "erp.accounts_payable",
    "erp.manufacturing",
    "erp.hrm",
    "erp.inventory",
    "erp.fixed_asset",
    "erp.sales",
    "erp.cash_bank",
    "erp.purchasing",
    "erp.taxation",
    "erp.scheduling",
];

const ALL_ACTIONS: &[&str] = &["create", "read", "update", "delete", "list", "export"];
const MANAGER_ACTIONS: &[&str] = &["create", "read", "update", "list", "export"];
const EDITOR_ACTIONS: &[&str] = &["create", "read", "update"];
const VIEWER_ACTIONS: &[&str] = &["read", "list", "export"];

struct RoleTemplate {
    name: &'static str,
    description: &'static str,
    actions: &'static [&'static str],
}

const TEMPLATES: &[RoleTemplate] = &[
    RoleTemplate {
        name: SUPER_ADMINISTRATOR,
        description: "Full system access across all tenants",
        actions: ALL_ACTIONS,
    },
    RoleTemplate {
        name: TENANT_OWNER,
        description: "Full access within their tenant",
        actions: ALL_ACTIONS,
    },
    RoleTemplate {
        name: ADMINISTRATOR,
        description: "Administrative access within tenant",
        actions: ALL_ACTIONS,
    },
    RoleTemplate {
        name: "Manager",
        description: "Management-level access with limited admin capabilities",
        actions: MANAGER_ACTIONS,
    },
    RoleTemplate {
        name: "Editor",
        description: "Can create and edit content",
        actions: EDITOR_ACTIONS,
    },
    RoleTemplate {
        name: "Viewer",
        description: "Read-only access",
        actions: VIEWER_ACTIONS,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    pub tenant_created: bool,
    pub roles_created: usize,
    pub roles_skipped: usize,
}

/// Create the system tenant and any missing role template. Idempotent;
/// existing roles are left untouched.
pub async fn seed_system_roles(directory: &dyn Directory) -> Result<SeedReport, ServiceError> {
    let mut report = SeedReport::default();
    let mut tx = directory.begin().await?;

    let system = match tx.find_tenant_by_slug(&TenantSlug::system()).await? {
        Some(tenant) => tenant,
        None => {
            let tenant = Tenant::system();
            tx.insert_tenant(&tenant).await?;
            report.tenant_created = true;
            tenant
        }
    };

    for template in TEMPLATES {
        if tx.find_role_by_name(system.id, template.name).await?.is_some() {
            report.roles_skipped += 1;
            continue;
        }
        let role = Role::new(system.id, template.name, template.description);
        tx.insert_role(&role).await?;
        for resource in RESOURCES {
            for action in template.actions {
                tx.insert_permission(&Permission::new(role.id, *resource, *action)).await?;
            }
        }
        report.roles_created += 1;
    }

    tx.commit().await?;
    info!(
        tenant_created = report.tenant_created,
        roles_created = report.roles_created,
        roles_skipped = report.roles_skipped,
        "system role templates seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;

    #[tokio::test]
    async fn seeding_twice_creates_nothing_new() {
        let directory = InMemoryDirectory::new();

        let first = seed_system_roles(&directory).await.unwrap();
        assert!(first.tenant_created);
        assert_eq!(first.roles_created, TEMPLATES.len());

        let second = seed_system_roles(&directory).await.unwrap();
        assert_eq!(second, SeedReport { tenant_created: false, roles_created: 0, roles_skipped: TEMPLATES.len() });
    }

    #[tokio::test]
    async fn viewer_template_is_read_only() {
        let directory = InMemoryDirectory::new();
        seed_system_roles(&directory).await.unwrap();

        let mut tx = directory.begin().await.unwrap();
        let system = tx.find_tenant_by_slug(&TenantSlug::system()).await.unwrap().unwrap();
        let viewer = tx.find_role_by_name(system.id, "Viewer").await.unwrap().unwrap();
        let permissions = tx.permissions_for_role(viewer.id).await.unwrap();

        assert_eq!(permissions.len(), RESOURCES.len() * VIEWER_ACTIONS.len());
        assert_eq!(permissions[0].qualified(), "portal:read");
        assert!(permissions.iter().all(|p| p.action != "delete" && p.action != "create"));
    }
}
