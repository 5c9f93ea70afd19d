//! `tenantgate-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it owns the
//! vocabulary (permissions, roles, scope), the phantom token format, the
//! session wire shape, the gateway header protocol and the tenant-selection
//! policy. Infra wires these to stores.

pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod introspection;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod session;

pub use authorize::{authorize, select_membership, AccessLevel, AuthzError, TenantSelection};
pub use claims::{validate_claims, Hs256Verifier, SignedClaims, SignedCredentialVerifier, TokenValidationError};
pub use credentials::{Argon2Hasher, CredentialHasher};
pub use error::AuthError;
pub use gateway::{extract_bearer, parse_trusted_headers, select_mode, strip_bearer_prefix, AuthMode, HeaderSource};
pub use introspection::{ActiveContext, IntrospectionResult};
pub use permissions::{build_scope, Permission, FALLBACK_SCOPE};
pub use principal::AuthContext;
pub use roles::Role;
pub use session::{ReferenceToken, SessionRecord, TenantContextUpdate};
