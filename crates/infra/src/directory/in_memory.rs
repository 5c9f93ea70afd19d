use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use tenantgate_core::{
    Email, Entity, Membership, MembershipId, Permission, Role, RoleId, Tenant, TenantId, TenantSlug, User,
    UserId,
};

use super::{Directory, DirectoryError, DirectoryTx};

/// In-memory directory for tests/dev.
///
/// A transaction holds the directory lock for its whole lifetime and edits a
/// working copy, so transactions are serializable and rollback is a drop.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<State>>,
    fail_next_commit: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Default)]
struct State {
    users: Vec<User>,
    tenants: Vec<Tenant>,
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    memberships: Vec<Membership>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `commit` fail after all statements succeeded.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl State {
    fn user_by_email(&self, email: &Email) -> Option<&User> {
        self.users.iter().find(|u| !u.is_deleted() && u.email == *email)
    }

    fn tenant_by_slug(&self, slug: &TenantSlug) -> Option<&Tenant> {
        self.tenants.iter().find(|t| t.slug == *slug)
    }

    fn roles_for_tenant(&self, tenant_id: TenantId) -> Vec<Role> {
        self.roles.iter().filter(|r| r.tenant_id == tenant_id).cloned().collect()
    }

    fn permissions_for_role(&self, role_id: RoleId) -> Vec<Permission> {
        self.permissions.iter().filter(|p| p.role_id == role_id).cloned().collect()
    }

    fn active_membership(&self, user_id: UserId, tenant_id: TenantId) -> Option<&Membership> {
        self.memberships
            .iter()
            .find(|m| m.is_active() && m.user_id == user_id && m.tenant_id == tenant_id)
    }

    fn membership_mut(&mut self, id: MembershipId) -> Result<&mut Membership, DirectoryError> {
        self.memberships
            .iter_mut()
            .find(|m| m.id == id && m.is_active())
            .ok_or(DirectoryError::NotFound("membership"))
    }
}

fn by_id<'a, E: Entity>(items: &'a [E], id: &E::Id) -> Option<&'a E> {
    items.iter().find(|e| e.id() == id)
}

fn replace<E: Entity + Clone>(items: &mut [E], item: &E, what: &'static str) -> Result<(), DirectoryError> {
    let slot = items
        .iter_mut()
        .find(|e| e.id() == item.id())
        .ok_or(DirectoryError::NotFound(what))?;
    *slot = item.clone();
    Ok(())
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id && !u.is_deleted()).cloned())
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, DirectoryError> {
        Ok(self.state.lock().await.user_by_email(email).cloned())
    }

    async fn find_user_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, DirectoryError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|u| {
                !u.is_deleted()
                    && u.provider
                        .as_ref()
                        .is_some_and(|b| b.provider == provider && b.provider_id == provider_id)
            })
            .cloned())
    }

    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>, DirectoryError> {
        Ok(by_id(&self.state.lock().await.tenants, &id).cloned())
    }

    async fn tenant_slug_exists(&self, slug: &TenantSlug) -> Result<bool, DirectoryError> {
        Ok(self.state.lock().await.tenant_by_slug(slug).is_some())
    }

    async fn find_role(&self, id: RoleId) -> Result<Option<Role>, DirectoryError> {
        Ok(by_id(&self.state.lock().await.roles, &id).cloned())
    }

    async fn roles_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Role>, DirectoryError> {
        Ok(self.state.lock().await.roles_for_tenant(tenant_id))
    }

    async fn permissions_for_role(&self, role_id: RoleId) -> Result<Vec<Permission>, DirectoryError> {
        Ok(self.state.lock().await.permissions_for_role(role_id))
    }

    async fn find_membership(&self, id: MembershipId) -> Result<Option<Membership>, DirectoryError> {
        let state = self.state.lock().await;
        Ok(state.memberships.iter().find(|m| m.id == id && m.is_active()).cloned())
    }

    async fn memberships_for_user(&self, user_id: UserId) -> Result<Vec<Membership>, DirectoryError> {
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.is_active() && m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn memberships_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Membership>, DirectoryError> {
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.is_active() && m.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn DirectoryTx>, DirectoryError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTx {
            guard,
            working,
            fail_commit: self.fail_next_commit.clone(),
        }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<State>,
    working: State,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl DirectoryTx for InMemoryTx {
    async fn find_user_by_email(&mut self, email: &Email) -> Result<Option<User>, DirectoryError> {
        Ok(self.working.user_by_email(email).cloned())
    }

    async fn find_tenant_by_slug(&mut self, slug: &TenantSlug) -> Result<Option<Tenant>, DirectoryError> {
        Ok(self.working.tenant_by_slug(slug).cloned())
    }

    async fn roles_for_tenant(&mut self, tenant_id: TenantId) -> Result<Vec<Role>, DirectoryError> {
        Ok(self.working.roles_for_tenant(tenant_id))
    }

    async fn find_role_by_name(&mut self, tenant_id: TenantId, name: &str) -> Result<Option<Role>, DirectoryError> {
        Ok(self
            .working
            .roles
            .iter()
            .find(|r| r.tenant_id == tenant_id && r.name == name)
            .cloned())
    }

    async fn permissions_for_role(&mut self, role_id: RoleId) -> Result<Vec<Permission>, DirectoryError> {
        Ok(self.working.permissions_for_role(role_id))
    }

    async fn find_membership_for(
        &mut self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> Result<Option<Membership>, DirectoryError> {
        Ok(self.working.active_membership(user_id, tenant_id).cloned())
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), DirectoryError> {
        if self.working.user_by_email(&user.email).is_some() {
            return Err(DirectoryError::Conflict(format!("email {} already registered", user.email)));
        }
        self.working.users.push(user.clone());
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> Result<(), DirectoryError> {
        replace(&mut self.working.users, user, "user")
    }

    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<(), DirectoryError> {
        if self.working.tenant_by_slug(&tenant.slug).is_some() {
            return Err(DirectoryError::Conflict(format!("tenant slug {} taken", tenant.slug)));
        }
        if self.working.tenants.iter().any(|t| t.name == tenant.name) {
            return Err(DirectoryError::Conflict(format!("tenant name {} taken", tenant.name)));
        }
        self.working.tenants.push(tenant.clone());
        Ok(())
    }

    async fn update_tenant(&mut self, tenant: &Tenant) -> Result<(), DirectoryError> {
        if self
            .working
            .tenants
            .iter()
            .any(|t| t.id != tenant.id && t.name == tenant.name)
        {
            return Err(DirectoryError::Conflict(format!("tenant name {} taken", tenant.name)));
        }
        replace(&mut self.working.tenants, tenant, "tenant")
    }

    async fn insert_role(&mut self, role: &Role) -> Result<(), DirectoryError> {
        if self
            .working
            .roles
            .iter()
            .any(|r| r.tenant_id == role.tenant_id && r.name == role.name)
        {
            return Err(DirectoryError::Conflict(format!("role {} already exists in tenant", role.name)));
        }
        self.working.roles.push(role.clone());
        Ok(())
    }

    async fn insert_permission(&mut self, permission: &Permission) -> Result<(), DirectoryError> {
        self.working.permissions.push(permission.clone());
        Ok(())
    }

    async fn update_permission(&mut self, permission: &Permission) -> Result<(), DirectoryError> {
        let slot = self
            .working
            .permissions
            .iter_mut()
            .find(|p| p.id == permission.id)
            .ok_or(DirectoryError::NotFound("permission"))?;
        *slot = permission.clone();
        Ok(())
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DirectoryError> {
        if self
            .working
            .active_membership(membership.user_id, membership.tenant_id)
            .is_some()
        {
            return Err(DirectoryError::Conflict("user is already a member of this tenant".into()));
        }
        self.working.memberships.push(membership.clone());
        Ok(())
    }

    async fn update_membership_role(&mut self, id: MembershipId, role_id: RoleId) -> Result<(), DirectoryError> {
        self.working.membership_mut(id)?.role_id = role_id;
        Ok(())
    }

    async fn delete_membership(&mut self, id: MembershipId) -> Result<(), DirectoryError> {
        self.working.membership_mut(id)?.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DirectoryError> {
        let InMemoryTx {
            mut guard,
            working,
            fail_commit,
        } = *self;
        if fail_commit.swap(false, Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("commit failed".into()));
        }
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User::with_password("Test", Email::parse(email).unwrap(), "digest".into())
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let dir = InMemoryDirectory::new();
        let alice = user("alice@example.com");
        {
            let mut tx = dir.begin().await.unwrap();
            tx.insert_user(&alice).await.unwrap();
        }
        assert_eq!(dir.find_user(alice.id).await.unwrap(), None);

        let mut tx = dir.begin().await.unwrap();
        tx.insert_user(&alice).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(dir.find_user(alice.id).await.unwrap(), Some(alice));
    }

    #[tokio::test]
    async fn injected_commit_failure_rolls_back() {
        let dir = InMemoryDirectory::new();
        let alice = user("alice@example.com");
        dir.fail_next_commit();

        let mut tx = dir.begin().await.unwrap();
        tx.insert_user(&alice).await.unwrap();
        assert!(matches!(tx.commit().await, Err(DirectoryError::Unavailable(_))));
        assert_eq!(dir.find_user_by_email(&alice.email).await.unwrap(), None);
    }

    #[tokio::test]
    async fn uniqueness_rules_hold() {
        let dir = InMemoryDirectory::new();
        let tenant = Tenant::new("Acme", TenantSlug::derive("Acme").unwrap());
        let alice = user("alice@example.com");
        let role = Role::new(tenant.id, "Viewer", "");

        let mut tx = dir.begin().await.unwrap();
        tx.insert_user(&alice).await.unwrap();
        tx.insert_tenant(&tenant).await.unwrap();
        tx.insert_role(&role).await.unwrap();
        tx.insert_membership(&Membership::new(alice.id, tenant.id, role.id)).await.unwrap();

        assert!(matches!(tx.insert_user(&user("ALICE@example.com")).await, Err(DirectoryError::Conflict(_))));
        assert!(matches!(
            tx.insert_role(&Role::new(tenant.id, "Viewer", "dup")).await,
            Err(DirectoryError::Conflict(_))
        ));
        assert!(matches!(
            tx.insert_membership(&Membership::new(alice.id, tenant.id, role.id)).await,
            Err(DirectoryError::Conflict(_))
        ));
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn removed_membership_frees_the_pair() {
        let dir = InMemoryDirectory::new();
        let (user_id, tenant_id, role_id) = (UserId::new(), TenantId::new(), RoleId::new());
        let first = Membership::new(user_id, tenant_id, role_id);

        let mut tx = dir.begin().await.unwrap();
        tx.insert_membership(&first).await.unwrap();
        tx.delete_membership(first.id).await.unwrap();
        tx.insert_membership(&Membership::new(user_id, tenant_id, role_id)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(dir.memberships_for_user(user_id).await.unwrap().len(), 1);
        assert_eq!(dir.find_membership(first.id).await.unwrap(), None);
    }
}
