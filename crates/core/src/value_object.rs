//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// - **Value Object**: no identity (`TenantSlug("acme")` equals any other `"acme"`)
/// - **Entity**: has identity (two tenants with the same id are the same tenant)
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

// ─────────────────────────────────────────────────────────────────────────────
// Tenant slug
// ─────────────────────────────────────────────────────────────────────────────

/// URL-safe tenant handle: `[a-z0-9]` runs joined by single hyphens.
///
/// Immutable after the tenant is created; renames touch the display name only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantSlug(String);

impl ValueObject for TenantSlug {}

impl TenantSlug {
    /// Slug of the distinguished tenant holding role templates.
    pub const SYSTEM: &'static str = "system";

    /// Derive a slug from a free-form company name.
    ///
    /// Lowercases, maps whitespace and `_` to `-`, drops every other character
    /// outside `[a-z0-9]`, collapses hyphen runs and trims hyphens at the edges.
    pub fn derive(name: &str) -> DomainResult<Self> {
        let mut slug = String::with_capacity(name.len());
        for ch in name.chars().flat_map(char::to_lowercase) {
            let mapped = match ch {
                'a'..='z' | '0'..='9' => ch,
                '_' => '-',
                c if c.is_whitespace() => '-',
                _ => continue,
            };
            if mapped == '-' && (slug.is_empty() || slug.ends_with('-')) {
                continue;
            }
            slug.push(mapped);
        }
        while slug.ends_with('-') {
            slug.pop();
        }

        if slug.is_empty() {
            return Err(DomainError::validation(
                "company name must contain at least one letter or digit",
            ));
        }
        Ok(Self(slug))
    }

    /// Accept an already-formed slug (e.g. loaded from storage).
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let valid = !raw.is_empty()
            && !raw.starts_with('-')
            && !raw.ends_with('-')
            && !raw.contains("--")
            && raw
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(DomainError::validation(format!("invalid tenant slug '{raw}'")));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn system() -> Self {
        Self(Self::SYSTEM.to_string())
    }

    /// Disambiguate a colliding slug with a unix-timestamp suffix.
    pub fn with_suffix(&self, unix_seconds: i64) -> Self {
        Self(format!("{}-{}", self.0, unix_seconds))
    }

    pub fn is_system(&self) -> bool {
        self.0 == Self::SYSTEM
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Email
// ─────────────────────────────────────────────────────────────────────────────

/// Normalized (trimmed, lowercased) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl ValueObject for Email {}

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let email = raw.trim().to_lowercase();
        let Some((local, domain)) = email.split_once('@') else {
            return Err(DomainError::validation("email must contain '@'"));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(DomainError::validation(format!("invalid email '{raw}'")));
        }
        if email.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("email must not contain whitespace"));
        }
        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn company_name_becomes_slug() {
        assert_eq!(TenantSlug::derive("Acme Inc").unwrap().as_str(), "acme-inc");
        assert_eq!(
            TenantSlug::derive("  Big__Co. (Europe)  ").unwrap().as_str(),
            "big-co-europe"
        );
        assert_eq!(TenantSlug::derive("a - b").unwrap().as_str(), "a-b");
    }

    #[test]
    fn symbol_only_name_is_rejected() {
        assert!(matches!(
            TenantSlug::derive("!!!"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn suffix_keeps_slug_shape() {
        let slug = TenantSlug::derive("Acme Inc").unwrap().with_suffix(1_700_000_000);
        assert_eq!(slug.as_str(), "acme-inc-1700000000");
        assert!(TenantSlug::parse(slug.as_str()).is_ok());
    }

    #[test]
    fn parse_rejects_malformed_slugs() {
        for raw in ["", "-acme", "acme-", "ac--me", "Acme", "acme inc"] {
            assert!(TenantSlug::parse(raw).is_err(), "{raw:?} should be rejected");
        }
        assert!(TenantSlug::parse("system").unwrap().is_system());
    }

    #[test]
    fn email_is_normalized() {
        let email = Email::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
        assert!(Email::parse("no-at-sign").is_err());
        assert!(Email::parse("@example.com").is_err());
        assert!(Email::parse("a@b@c").is_err());
    }

    proptest! {
        #[test]
        fn derived_slugs_are_always_url_safe(name in "\\PC{0,40}") {
            if let Ok(slug) = TenantSlug::derive(&name) {
                prop_assert!(TenantSlug::parse(slug.as_str()).is_ok());
                // Deriving from a slug is a fixed point.
                prop_assert_eq!(TenantSlug::derive(slug.as_str()).unwrap(), slug);
            }
        }
    }
}
