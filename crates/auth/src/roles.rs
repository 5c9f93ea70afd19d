use std::borrow::Cow;

use serde::{Deserialize, Serialize};

pub const TENANT_OWNER: &str = "Tenant Owner";
pub const ADMINISTRATOR: &str = "Administrator";
pub const SUPER_ADMINISTRATOR: &str = "Super Administrator";

/// Role name as carried in sessions, headers and signed credentials.
///
/// Names are compared exactly; admin and owner status derive from the name,
/// never from the role id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tenant Owner, Administrator or Super Administrator.
    pub fn is_admin(&self) -> bool {
        matches!(self.as_str(), TENANT_OWNER | ADMINISTRATOR | SUPER_ADMINISTRATOR)
    }

    pub fn is_owner(&self) -> bool {
        self.as_str() == TENANT_OWNER
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
