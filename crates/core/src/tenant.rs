//! Tenant: the organizational isolation boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult, TenantId, TenantSlug};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub slug: TenantSlug,
    pub is_active: bool,
    /// Free-form per-tenant settings.
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: impl Into<String>, slug: TenantSlug) -> Self {
        let now = Utc::now();
        Self {
            id: TenantId::new(),
            name: name.into(),
            slug,
            is_active: true,
            config: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    /// The tenant that holds role templates. It never has real members.
    pub fn system() -> Self {
        Self::new("System", TenantSlug::system())
    }

    pub fn is_system(&self) -> bool {
        self.slug.is_system()
    }

    /// Change the display name. The slug never changes.
    pub fn rename(&mut self, name: &str) -> DomainResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("tenant name must not be empty"));
        }
        self.name = name.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_keeps_slug() {
        let mut tenant = Tenant::new("Acme Inc", TenantSlug::derive("Acme Inc").unwrap());
        tenant.rename("  Acme Holdings ").unwrap();
        assert_eq!(tenant.name, "Acme Holdings");
        assert_eq!(tenant.slug.as_str(), "acme-inc");
        assert!(tenant.rename("   ").is_err());
    }
}
