//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tenantgate_auth::{AuthError, CredentialHasher, HeaderSource};
use tenantgate_core::{Email, Membership, Role, Tenant, TenantId, TenantSlug, User, UserId};

use crate::accounts::AccountService;
use crate::admin::TenantAdmin;
use crate::auth_service::AuthService;
use crate::authorization::AuthorizationResolver;
use crate::credentials::CredentialVerifier;
use crate::directory::{Directory, InMemoryDirectory};
use crate::notify::{LoggingNotifier, Notifier};
use crate::provisioning::registration::copy_role_templates;
use crate::provisioning::{seed_system_roles, InMemoryConsumerRegistry, RegistrationSaga};
use crate::session::{SessionConfig, SessionManager};
use crate::store::{InMemoryKeyValueStore, KeyValueStore};

pub const PASSWORD: &str = "correct-horse";

/// Reversible "hash" so tests skip Argon2's cost.
pub struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, secret: &str) -> Result<String, AuthError> {
        Ok(format!("plain${secret}"))
    }

    fn verify(&self, secret: &str, digest: &str) -> Result<bool, AuthError> {
        Ok(digest.strip_prefix("plain$") == Some(secret))
    }
}

pub struct Fixture {
    pub directory: Arc<InMemoryDirectory>,
    pub store: Arc<InMemoryKeyValueStore>,
    pub registry: Arc<InMemoryConsumerRegistry>,
    pub hasher: Arc<dyn CredentialHasher>,
}

impl Fixture {
    /// Fresh stores with system role templates seeded.
    pub async fn new() -> Self {
        let fx = Self::with_directory(Arc::new(InMemoryDirectory::new()));
        seed_system_roles(fx.directory.as_ref()).await.unwrap();
        fx
    }

    pub fn with_directory(directory: Arc<InMemoryDirectory>) -> Self {
        Self {
            directory,
            store: Arc::new(InMemoryKeyValueStore::new()),
            registry: Arc::new(InMemoryConsumerRegistry::new()),
            hasher: Arc::new(PlainHasher),
        }
    }

    fn dyn_directory(&self) -> Arc<dyn Directory> {
        self.directory.clone()
    }

    fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::new(LoggingNotifier)
    }

    pub fn credentials(&self) -> CredentialVerifier {
        CredentialVerifier::new(self.dyn_directory(), self.hasher.clone())
    }

    pub fn resolver(&self) -> AuthorizationResolver {
        AuthorizationResolver::new(self.dyn_directory())
    }

    pub fn sessions(&self) -> SessionManager {
        SessionManager::new(self.store.clone(), Duration::from_secs(1800))
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.dyn_directory(), self.credentials(), self.resolver(), self.sessions())
    }

    pub fn accounts(&self) -> AccountService {
        let store: Arc<dyn KeyValueStore> = self.store.clone();
        AccountService::new(
            self.dyn_directory(),
            self.resolver(),
            self.hasher.clone(),
            self.sessions(),
            store,
            SessionConfig::default(),
            self.notifier(),
        )
    }

    pub fn admin(&self) -> TenantAdmin {
        TenantAdmin::new(self.dyn_directory(), self.resolver(), self.hasher.clone(), self.accounts())
    }

    pub fn saga(&self) -> RegistrationSaga {
        RegistrationSaga::new(self.dyn_directory(), self.registry.clone(), self.hasher.clone(), self.notifier())
    }

    /// Active user whose password is [`PASSWORD`].
    pub async fn user(&self, email: &str) -> User {
        let digest = self.hasher.hash(PASSWORD).unwrap();
        let user = User::with_password("Test User", Email::parse(email).unwrap(), digest);
        let mut tx = self.directory.begin().await.unwrap();
        tx.insert_user(&user).await.unwrap();
        tx.commit().await.unwrap();
        user
    }

    pub async fn save_user(&self, user: &User) {
        let mut tx = self.directory.begin().await.unwrap();
        tx.update_user(user).await.unwrap();
        tx.commit().await.unwrap();
    }

    /// Tenant with copies of every role template.
    pub async fn tenant(&self, name: &str) -> Tenant {
        let tenant = Tenant::new(name, TenantSlug::derive(name).unwrap());
        let mut tx = self.directory.begin().await.unwrap();
        tx.insert_tenant(&tenant).await.unwrap();
        copy_role_templates(tx.as_mut(), tenant.id).await.unwrap();
        tx.commit().await.unwrap();
        tenant
    }

    pub async fn system_tenant(&self) -> Tenant {
        let mut tx = self.directory.begin().await.unwrap();
        tx.find_tenant_by_slug(&TenantSlug::system()).await.unwrap().unwrap()
    }

    pub async fn role(&self, tenant_id: TenantId, name: &str) -> Role {
        self.directory
            .roles_for_tenant(tenant_id)
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.name == name)
            .unwrap()
    }

    pub async fn join(&self, user_id: UserId, tenant_id: TenantId, role_name: &str) -> Membership {
        let role = self.role(tenant_id, role_name).await;
        let membership = Membership::new(user_id, tenant_id, role.id);
        let mut tx = self.directory.begin().await.unwrap();
        tx.insert_membership(&membership).await.unwrap();
        tx.commit().await.unwrap();
        membership
    }
}

#[derive(Debug, Default, Clone)]
pub struct TestHeaders(HashMap<String, String>);

impl TestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }
}

impl HeaderSource for TestHeaders {
    fn header(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}
