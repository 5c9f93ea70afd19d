//! User identity record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DomainError, DomainResult, Email, UserId};

/// Binding to an external identity provider account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderBinding {
    pub provider: String,
    pub provider_id: String,
}

/// A user account.
///
/// # Invariants
/// - `email` is unique across non-deleted users.
/// - A user with a provider binding need not carry a password digest.
/// - Users are soft-deleted only (`deleted_at`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Stable external identity handed to the upstream gateway.
    pub identity: Uuid,
    pub name: String,
    pub email: Email,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub provider: Option<ProviderBinding>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// New active, unverified account with a password digest.
    pub fn with_password(name: impl Into<String>, email: Email, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            identity: Uuid::new_v4(),
            name: name.into(),
            email,
            password_hash: Some(password_hash),
            is_active: true,
            is_verified: false,
            provider: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// New account created on first external-identity login.
    pub fn from_provider(name: impl Into<String>, email: Email, binding: ProviderBinding) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            identity: Uuid::new_v4(),
            name: name.into(),
            email,
            password_hash: None,
            is_active: true,
            is_verified: true,
            provider: Some(binding),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn link_provider(&mut self, binding: ProviderBinding) {
        self.provider = Some(binding);
        self.touch();
    }

    pub fn rename(&mut self, name: &str) -> DomainResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }
        self.name = name.to_string();
        self.touch();
        Ok(())
    }

    pub fn set_password_hash(&mut self, digest: String) {
        self.password_hash = Some(digest);
        self.touch();
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.touch();
    }

    pub fn mark_verified(&mut self) {
        self.is_verified = true;
        self.touch();
    }

    /// Deactivates as well; a deleted account never logs in again.
    pub fn soft_delete(&mut self) {
        let now = Utc::now();
        self.is_active = false;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::with_password("Ada", Email::parse("ada@example.com").unwrap(), "digest".into())
    }

    #[test]
    fn rename_trims_and_rejects_blank_names() {
        let mut user = user();
        user.rename("  Ada Lovelace ").unwrap();
        assert_eq!(user.name, "Ada Lovelace");
        assert!(user.rename("   ").is_err());
        assert_eq!(user.name, "Ada Lovelace");
    }

    #[test]
    fn soft_delete_keeps_the_row_but_disables_it() {
        let mut user = user();
        user.soft_delete();
        assert!(user.is_deleted());
        assert!(!user.is_active);
        assert_eq!(user.updated_at, user.deleted_at.unwrap());
    }
}
