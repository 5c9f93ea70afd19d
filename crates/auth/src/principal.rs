use serde::{Deserialize, Serialize};

use tenantgate_core::{RoleId, TenantId, UserId};

use crate::{Permission, Role};

/// Resolved identity for one request, whichever authenticator produced it.
///
/// Header-trust and bearer authentication both end here, so handlers never
/// know which mode was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role_id: Option<RoleId>,
    pub role: Option<Role>,
    pub permissions: Vec<Permission>,
}

impl AuthContext {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p.is_wildcard() || p.as_str() == permission)
    }
}
