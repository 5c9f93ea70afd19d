use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use tenantgate_auth::{Argon2Hasher, CredentialHasher, Hs256Verifier};
use tenantgate_infra::{
    provisioning::ConsumerRegistryError, seed_system_roles, AccountService, AuthService, AuthorizationResolver,
    BearerBackend, ConsumerRegistry, CredentialVerifier, Directory, HttpConsumerRegistry, InMemoryConsumerRegistry,
    InMemoryDirectory, InMemoryKeyValueStore, IntrospectionService, KeyValueStore, LoggingNotifier, Notifier,
    OAuthService, OAuthStateStore, PgDirectory, RegistrationSaga, RequestAuthenticator, ServiceError,
    SessionManager, TenantAdmin,
};

use crate::config::{AppConfig, BearerMode};

#[cfg(feature = "redis")]
use tenantgate_infra::store::RedisKeyValueStore;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to connect to {backend}: {message}")]
    Connect { backend: &'static str, message: String },

    #[error("invalid consumer registry configuration: {0}")]
    Registry(#[from] ConsumerRegistryError),

    #[error("system role seeding failed: {0}")]
    Seed(#[from] ServiceError),
}

/// Everything the handlers need, built once per process.
#[derive(Clone)]
pub struct AppServices {
    pub auth: AuthService,
    pub authenticator: RequestAuthenticator,
    pub introspection: IntrospectionService,
    pub registration: RegistrationSaga,
    pub admin: TenantAdmin,
    pub accounts: AccountService,
    pub oauth: OAuthService,
}

/// The capabilities the services are assembled from.
pub struct Backends {
    pub store: Arc<dyn KeyValueStore>,
    pub directory: Arc<dyn Directory>,
    pub registry: Arc<dyn ConsumerRegistry>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub notifier: Arc<dyn Notifier>,
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let backends = if config.use_persistent_stores {
        build_persistent_backends(config).await?
    } else {
        build_in_memory_backends(config)?
    };

    if config.seed_system_roles {
        let report = seed_system_roles(backends.directory.as_ref()).await?;
        tracing::info!(
            tenant_created = report.tenant_created,
            roles_created = report.roles_created,
            roles_skipped = report.roles_skipped,
            "system roles seeded"
        );
    }

    Ok(assemble(config, backends))
}

/// Wire services over the given backends.
pub fn assemble(config: &AppConfig, backends: Backends) -> AppServices {
    let Backends {
        store,
        directory,
        registry,
        hasher,
        notifier,
    } = backends;

    let sessions = SessionManager::new(store.clone(), config.session.ttl);
    let resolver = AuthorizationResolver::new(directory.clone());
    let credentials = CredentialVerifier::new(directory.clone(), hasher.clone());
    let auth = AuthService::new(directory.clone(), credentials, resolver.clone(), sessions.clone());

    let bearer = match config.bearer_mode {
        BearerMode::Session => BearerBackend::Sessions(sessions.clone()),
        BearerMode::Signed => BearerBackend::Signed(Arc::new(Hs256Verifier::new(config.jwt_secret.as_bytes()))),
    };

    let accounts = AccountService::new(
        directory.clone(),
        resolver.clone(),
        hasher.clone(),
        sessions.clone(),
        store.clone(),
        config.session,
        notifier.clone(),
    );

    AppServices {
        authenticator: RequestAuthenticator::new(bearer),
        introspection: IntrospectionService::new(sessions),
        registration: RegistrationSaga::new(directory.clone(), registry, hasher.clone(), notifier),
        admin: TenantAdmin::new(directory, resolver, hasher, accounts.clone()),
        accounts,
        oauth: OAuthService::new(
            OAuthStateStore::new(store, config.session.oauth_state_ttl),
            auth.clone(),
        ),
        auth,
    }
}

fn build_in_memory_backends(config: &AppConfig) -> Result<Backends, StartupError> {
    tracing::info!("using in-memory session store and directory");
    Ok(Backends {
        store: Arc::new(InMemoryKeyValueStore::new()),
        directory: Arc::new(InMemoryDirectory::new()),
        registry: consumer_registry(config)?,
        hasher: Arc::new(Argon2Hasher::new(config.password_pepper.clone())),
        notifier: Arc::new(LoggingNotifier),
    })
}

async fn build_persistent_backends(config: &AppConfig) -> Result<Backends, StartupError> {
    let database_url = config.database_url.as_deref().unwrap_or_default();
    let pool = PgPool::connect(database_url).await.map_err(|e| StartupError::Connect {
        backend: "postgres",
        message: e.to_string(),
    })?;
    let directory: Arc<dyn Directory> = Arc::new(PgDirectory::new(pool, config.store_timeout));

    Ok(Backends {
        store: persistent_store(config).await?,
        directory,
        registry: consumer_registry(config)?,
        hasher: Arc::new(Argon2Hasher::new(config.password_pepper.clone())),
        notifier: Arc::new(LoggingNotifier),
    })
}

#[cfg(feature = "redis")]
async fn persistent_store(config: &AppConfig) -> Result<Arc<dyn KeyValueStore>, StartupError> {
    let store = RedisKeyValueStore::connect(&config.redis_url, config.store_timeout)
        .await
        .map_err(|e| StartupError::Connect {
            backend: "redis",
            message: e.to_string(),
        })?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn persistent_store(_config: &AppConfig) -> Result<Arc<dyn KeyValueStore>, StartupError> {
    tracing::warn!("USE_PERSISTENT_STORES=true but redis feature not enabled, sessions stay in-memory");
    Ok(Arc::new(InMemoryKeyValueStore::new()))
}

fn consumer_registry(config: &AppConfig) -> Result<Arc<dyn ConsumerRegistry>, StartupError> {
    match &config.gateway_admin_url {
        Some(url) => Ok(Arc::new(HttpConsumerRegistry::new(url.clone(), config.gateway_admin_timeout)?)),
        None => {
            tracing::warn!("GATEWAY_ADMIN_URL not set; gateway consumers are recorded in-memory only");
            Ok(Arc::new(InMemoryConsumerRegistry::new()))
        }
    }
}
