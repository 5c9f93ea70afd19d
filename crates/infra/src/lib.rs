//! Infrastructure layer: stores, directory, sessions, and the services that
//! compose them.

pub mod accounts;
pub mod admin;
pub mod auth_service;
pub mod authorization;
pub mod credentials;
pub mod deadline;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod introspection;
pub mod notify;
pub mod oauth;
pub mod provisioning;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use accounts::AccountService;
pub use admin::{MembershipDetail, TenantAdmin, TenantMember, TenantRole, UserProfile};
pub use auth_service::{AuthService, ExternalIdentity, LoginOutcome, LoginSuccess, TenantChoice, UserSummary};
pub use authorization::{AuthorizationResolver, Resolution, ResolvedContext, TenantSummary};
pub use credentials::CredentialVerifier;
pub use directory::{Directory, DirectoryError, DirectoryTx, InMemoryDirectory, PgDirectory};
pub use error::ServiceError;
pub use gateway::{parse_session_token, BearerBackend, RequestAuthenticator};
pub use introspection::IntrospectionService;
pub use notify::{LoggingNotifier, Notification, Notifier};
pub use oauth::{IdentityProvider, OAuthService};
pub use provisioning::{
    seed_system_roles, ConsumerRegistry, HttpConsumerRegistry, InMemoryConsumerRegistry, Registration,
    RegisteredTenant, RegistrationSaga,
};
pub use session::{OAuthStateStore, OneTimeTokens, SessionConfig, SessionError, SessionManager};
pub use store::{InMemoryKeyValueStore, KeyValueStore, StoreError};
