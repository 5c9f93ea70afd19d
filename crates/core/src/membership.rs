//! Membership: one user, one tenant, one role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MembershipId, RoleId, TenantId, UserId};

/// At most one non-deleted membership exists per `(user_id, tenant_id)`.
/// Role changes replace `role_id` in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role_id: RoleId,
    pub joined_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Membership {
    pub fn new(user_id: UserId, tenant_id: TenantId, role_id: RoleId) -> Self {
        Self {
            id: MembershipId::new(),
            user_id,
            tenant_id,
            role_id,
            joined_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
