//! Introspection result handed to the upstream gateway.

use serde::{Deserialize, Serialize};

use tenantgate_core::{RoleId, TenantId, UserId};

use crate::gateway::{headers, TRUST_MARKER};
use crate::SessionRecord;

/// `{active: false}` or `{active: true, ...context}`.
///
/// Inactive results carry no other field at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionResult {
    pub active: bool,
    #[serde(flatten)]
    pub context: Option<ActiveContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveContext {
    pub sub: String,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<RoleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    pub permissions: Vec<String>,
    pub exp: i64,
}

impl IntrospectionResult {
    pub fn inactive() -> Self {
        Self {
            active: false,
            context: None,
        }
    }

    pub fn from_session(record: &SessionRecord) -> Self {
        Self {
            active: true,
            context: Some(ActiveContext {
                sub: format!("user_{}", record.user_id),
                tenant_id: record.tenant_id,
                user_id: record.user_id,
                role_id: record.role_id,
                role_name: record.primary_role().map(|r| r.as_str().to_string()),
                permissions: record.permissions.iter().map(|p| p.as_str().to_string()).collect(),
                exp: record.expires_at,
            }),
        }
    }

    /// Headers the gateway injects downstream; exactly what header-trust mode reads.
    ///
    /// Empty for inactive results.
    pub fn upstream_headers(&self) -> Vec<(&'static str, String)> {
        let Some(ctx) = self.context.as_ref().filter(|_| self.active) else {
            return Vec::new();
        };

        let mut out = vec![
            (headers::TENANT_ID, ctx.tenant_id.to_string()),
            (headers::USER_ID, ctx.user_id.to_string()),
        ];
        if let Some(role_id) = ctx.role_id {
            out.push((headers::ROLE_ID, role_id.to_string()));
        }
        if let Some(role_name) = &ctx.role_name {
            out.push((headers::ROLE_NAME, role_name.clone()));
        }
        out.push((headers::PERMISSIONS, ctx.permissions.join(",")));
        out.push((headers::AUTHENTICATED, TRUST_MARKER.to_string()));
        out
    }
}
