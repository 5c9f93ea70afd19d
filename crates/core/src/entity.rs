//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

macro_rules! impl_entity {
    ($t:ty, $id:ty) => {
        impl Entity for $t {
            type Id = $id;

            fn id(&self) -> &Self::Id {
                &self.id
            }
        }
    };
}

impl_entity!(crate::User, crate::UserId);
impl_entity!(crate::Tenant, crate::TenantId);
impl_entity!(crate::Role, crate::RoleId);
impl_entity!(crate::Permission, crate::PermissionId);
impl_entity!(crate::Membership, crate::MembershipId);
