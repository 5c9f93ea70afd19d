//! `tenantgate-core`: identity and tenancy domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod membership;
pub mod role;
pub mod tenant;
pub mod user;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{MembershipId, PermissionId, RoleId, TenantId, UserId};
pub use membership::Membership;
pub use role::{Permission, Role};
pub use tenant::Tenant;
pub use user::{ProviderBinding, User};
pub use value_object::{Email, TenantSlug, ValueObject};
