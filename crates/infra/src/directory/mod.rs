//! Relational directory: the system of record for users, tenants, roles,
//! permissions and memberships.
//!
//! Reads go through [`Directory`]. Every write goes through a [`DirectoryTx`]
//! so multi-row mutations (registration, role copies) commit atomically.
//! Dropping a transaction without `commit` rolls it back.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use tenantgate_core::{
    Email, Membership, MembershipId, Permission, Role, RoleId, Tenant, TenantId, TenantSlug, User,
    UserId,
};

use crate::deadline::DeadlineError;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryDirectory;
pub use postgres::PgDirectory;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("directory call '{operation}' timed out after {after_ms}ms")]
    Timeout { operation: &'static str, after_ms: u64 },

    #[error("corrupt directory row: {0}")]
    Corrupt(String),
}

impl DeadlineError for DirectoryError {
    fn deadline_exceeded(operation: &'static str, after: Duration) -> Self {
        DirectoryError::Timeout {
            operation,
            after_ms: after.as_millis() as u64,
        }
    }
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError>;
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, DirectoryError>;
    async fn find_user_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, DirectoryError>;

    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>, DirectoryError>;
    async fn tenant_slug_exists(&self, slug: &TenantSlug) -> Result<bool, DirectoryError>;

    async fn find_role(&self, id: RoleId) -> Result<Option<Role>, DirectoryError>;
    async fn roles_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Role>, DirectoryError>;
    /// In insertion order.
    async fn permissions_for_role(&self, role_id: RoleId) -> Result<Vec<Permission>, DirectoryError>;

    async fn find_membership(&self, id: MembershipId) -> Result<Option<Membership>, DirectoryError>;
    /// Non-deleted memberships only.
    async fn memberships_for_user(&self, user_id: UserId) -> Result<Vec<Membership>, DirectoryError>;
    /// Non-deleted memberships only.
    async fn memberships_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Membership>, DirectoryError>;

    async fn begin(&self) -> Result<Box<dyn DirectoryTx>, DirectoryError>;
}

/// Unit of work over the directory.
#[async_trait]
pub trait DirectoryTx: Send {
    async fn find_user_by_email(&mut self, email: &Email) -> Result<Option<User>, DirectoryError>;
    async fn find_tenant_by_slug(&mut self, slug: &TenantSlug) -> Result<Option<Tenant>, DirectoryError>;
    async fn roles_for_tenant(&mut self, tenant_id: TenantId) -> Result<Vec<Role>, DirectoryError>;
    async fn find_role_by_name(&mut self, tenant_id: TenantId, name: &str) -> Result<Option<Role>, DirectoryError>;
    async fn permissions_for_role(&mut self, role_id: RoleId) -> Result<Vec<Permission>, DirectoryError>;
    async fn find_membership_for(
        &mut self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> Result<Option<Membership>, DirectoryError>;

    async fn insert_user(&mut self, user: &User) -> Result<(), DirectoryError>;
    async fn update_user(&mut self, user: &User) -> Result<(), DirectoryError>;
    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<(), DirectoryError>;
    async fn update_tenant(&mut self, tenant: &Tenant) -> Result<(), DirectoryError>;
    async fn insert_role(&mut self, role: &Role) -> Result<(), DirectoryError>;
    async fn insert_permission(&mut self, permission: &Permission) -> Result<(), DirectoryError>;
    async fn update_permission(&mut self, permission: &Permission) -> Result<(), DirectoryError>;
    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DirectoryError>;
    async fn update_membership_role(&mut self, id: MembershipId, role_id: RoleId) -> Result<(), DirectoryError>;
    /// Soft delete.
    async fn delete_membership(&mut self, id: MembershipId) -> Result<(), DirectoryError>;

    async fn commit(self: Box<Self>) -> Result<(), DirectoryError>;
}
