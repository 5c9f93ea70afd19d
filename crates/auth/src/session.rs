//! Phantom token format and the session record it points at.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tenantgate_core::{RoleId, TenantId, UserId};

use crate::{AuthContext, Permission, Role};

pub const TOKEN_PREFIX: &str = "ref_";
const TOKEN_RANDOM_BYTES: usize = 32;
/// Prefix plus 64 lowercase hex characters.
pub const TOKEN_LEN: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_BYTES * 2;

/// Opaque reference token. Carries no claims; the session lives server-side.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ReferenceToken(String);

impl ReferenceToken {
    /// 256 bits from the OS CSPRNG, hex-encoded behind the fixed prefix.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_RANDOM_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(format!("{TOKEN_PREFIX}{}", hex::encode(bytes)))
    }

    /// Shape check only: prefix, length and lowercase hex body.
    ///
    /// Anything rejected here can be treated as inactive without touching a store.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != TOKEN_LEN {
            return None;
        }
        let body = raw.strip_prefix(TOKEN_PREFIX)?;
        body.bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
            .then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe form: prefix and the first few hex characters.
    pub fn redacted(&self) -> &str {
        &self.0[..TOKEN_PREFIX.len() + 6]
    }
}

impl core::fmt::Debug for ReferenceToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ReferenceToken({}…)", self.redacted())
    }
}

/// Denormalized authorization snapshot stored under `session:<token>`.
///
/// Self-contained: introspection reads nothing else. Role or permission
/// changes reach a session only at the next login or tenant switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: UserId,
    pub user_identity: Uuid,
    pub tenant_id: TenantId,
    pub tenant_slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<RoleId>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub scope: String,
    pub email: String,
    pub name: String,
    /// Unix seconds.
    pub issued_at: i64,
    /// Unix seconds.
    pub expires_at: i64,
}

impl SessionRecord {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    pub fn primary_role(&self) -> Option<&Role> {
        self.roles.first()
    }

    pub fn auth_context(&self) -> AuthContext {
        AuthContext {
            user_id: self.user_id,
            tenant_id: self.tenant_id,
            role_id: self.role_id,
            role: self.primary_role().cloned(),
            permissions: self.permissions.clone(),
        }
    }
}

/// Tenant-dependent part of a session, replaced wholesale on tenant switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContextUpdate {
    pub tenant_id: TenantId,
    pub tenant_slug: String,
    pub role_id: Option<RoleId>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub scope: String,
}

impl TenantContextUpdate {
    pub fn apply(self, record: &mut SessionRecord) {
        record.tenant_id = self.tenant_id;
        record.tenant_slug = self.tenant_slug;
        record.role_id = self.role_id;
        record.roles = self.roles;
        record.permissions = self.permissions;
        record.scope = self.scope;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn generated_tokens_pass_shape_check() {
        let token = ReferenceToken::generate();
        assert_eq!(token.as_str().len(), 68);
        assert!(token.as_str().starts_with("ref_"));
        assert_eq!(ReferenceToken::parse(token.as_str()), Some(token.clone()));
        assert_ne!(ReferenceToken::generate(), token);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let good = ReferenceToken::generate();
        let upper = good.as_str().to_uppercase().replacen("REF_", "ref_", 1);
        let wrong_prefix = good.as_str().replacen("ref_", "tok_", 1);
        let short = &good.as_str()[..67];
        for raw in ["", "ref_", short, wrong_prefix.as_str(), upper.as_str()] {
            assert!(ReferenceToken::parse(raw).is_none(), "{raw:?}");
        }
    }

    #[test]
    fn debug_does_not_leak_the_token() {
        let token = ReferenceToken::generate();
        let shown = format!("{token:?}");
        assert!(!shown.contains(token.as_str()));
        assert!(shown.starts_with("ReferenceToken(ref_"));
    }

    #[test]
    fn wire_shape_uses_documented_keys() {
        let record = SessionRecord {
            user_id: UserId::new(),
            user_identity: Uuid::new_v4(),
            tenant_id: TenantId::new(),
            tenant_slug: "acme".into(),
            role_id: None,
            roles: vec![Role::new("Viewer")],
            permissions: vec![Permission::new("portal:read")],
            scope: "portal:read".into(),
            email: "a@acme.test".into(),
            name: "A".into(),
            issued_at: 10,
            expires_at: 20,
        };
        let json = serde_json::to_value(&record).unwrap();
        for key in [
            "user_id", "user_identity", "tenant_id", "tenant_slug", "roles", "permissions",
            "scope", "email", "name", "issued_at", "expires_at",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json.get("role_id").is_none());
        assert!(record.is_expired_at(20));
        assert!(!record.is_expired_at(19));
    }

    proptest! {
        #[test]
        fn parse_never_accepts_wrong_lengths(raw in "ref_[0-9a-f]{0,80}") {
            prop_assume!(raw.len() != TOKEN_LEN);
            prop_assert!(ReferenceToken::parse(&raw).is_none());
        }
    }
}
