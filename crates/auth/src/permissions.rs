use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Scope granted to a role that carries no permissions at all.
pub const FALLBACK_SCOPE: &str = "read:basic";

/// Permission string in `resource:action` form (e.g. `"erp.sales:read"`).
///
/// A wildcard permission `"*"` can be used by policy layers to indicate
/// "allow all" without enumerating resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn qualified(resource: &str, action: &str) -> Self {
        Self(Cow::Owned(format!("{resource}:{action}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&tenantgate_core::Permission> for Permission {
    fn from(value: &tenantgate_core::Permission) -> Self {
        Self::qualified(&value.resource, &value.action)
    }
}

/// OAuth-style scope: permissions joined by single spaces, in order.
pub fn build_scope(permissions: &[Permission]) -> String {
    if permissions.is_empty() {
        return FALLBACK_SCOPE.to_string();
    }
    permissions
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_joins_in_order() {
        let perms = vec![
            Permission::qualified("portal", "read"),
            Permission::qualified("portal", "list"),
            Permission::qualified("portal", "export"),
        ];
        assert_eq!(build_scope(&perms), "portal:read portal:list portal:export");
    }

    #[test]
    fn empty_role_gets_fallback_scope() {
        assert_eq!(build_scope(&[]), "read:basic");
    }
}
