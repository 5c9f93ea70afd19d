use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use tenantgate_auth::{ReferenceToken, SessionRecord, TenantContextUpdate};
use tenantgate_core::UserId;

use super::{SessionError, SESSION_KEY_PREFIX};
use crate::store::KeyValueStore;

/// Unix-seconds clock. Injectable so expiry can be tested without sleeping.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Owns the session lifecycle: create, read, refresh, retarget, revoke.
///
/// Concurrent writes to the same token are last-write-wins.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    clock: Clock,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            clock: Arc::new(|| chrono::Utc::now().timestamp()),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    fn key(token: &ReferenceToken) -> String {
        format!("{SESSION_KEY_PREFIX}{}", token.as_str())
    }

    pub fn generate_reference_token(&self) -> ReferenceToken {
        ReferenceToken::generate()
    }

    /// Stamp `issued_at`/`expires_at`, persist, and hand back the new token.
    pub async fn create_session(&self, mut record: SessionRecord) -> Result<ReferenceToken, SessionError> {
        let now = self.now();
        record.issued_at = now;
        record.expires_at = now + self.ttl.as_secs() as i64;

        let token = self.generate_reference_token();
        self.write(&token, &record, self.ttl).await?;
        debug!(token = token.redacted(), user_id = %record.user_id, "session created");
        Ok(token)
    }

    /// Absent and expired records both fail with `NotFound`; an expired
    /// record still present in the store is deleted on the way out.
    pub async fn get_session(&self, token: &ReferenceToken) -> Result<SessionRecord, SessionError> {
        let key = Self::key(token);
        let raw = self.store.get(&key).await?.ok_or(SessionError::NotFound)?;
        let record: SessionRecord =
            serde_json::from_str(&raw).map_err(|e| SessionError::Serialization(e.to_string()))?;

        if record.is_expired_at(self.now()) {
            debug!(token = token.redacted(), "expired session evicted on read");
            if let Err(err) = self.store.delete(&key).await {
                warn!(token = token.redacted(), error = %err, "failed to evict expired session");
            }
            return Err(SessionError::NotFound);
        }
        Ok(record)
    }

    /// Extend the session by a full TTL. The token value does not change.
    ///
    /// `expires_at` strictly increases even when two refreshes land in the
    /// same second.
    pub async fn refresh_session(&self, token: &ReferenceToken) -> Result<SessionRecord, SessionError> {
        let mut record = self.get_session(token).await?;
        let now = self.now();
        record.expires_at = (now + self.ttl.as_secs() as i64).max(record.expires_at + 1);

        let remaining = Duration::from_secs((record.expires_at - now).max(1) as u64);
        self.write(token, &record, remaining).await?;
        Ok(record)
    }

    /// Idempotent.
    pub async fn delete_session(&self, token: &ReferenceToken) -> Result<(), SessionError> {
        self.store.delete(&Self::key(token)).await?;
        Ok(())
    }

    /// Replace the tenant-dependent fields, keeping the remaining lifetime.
    pub async fn update_tenant_context(
        &self,
        token: &ReferenceToken,
        update: TenantContextUpdate,
    ) -> Result<SessionRecord, SessionError> {
        let mut record = self.get_session(token).await?;
        update.apply(&mut record);

        let remaining = match self.store.ttl(&Self::key(token)).await? {
            Some(ttl) if !ttl.is_zero() => ttl,
            _ => Duration::from_secs((record.expires_at - self.now()).max(1) as u64),
        };
        self.write(token, &record, remaining).await?;
        Ok(record)
    }

    /// Full scan over every session key. Unreadable records are skipped.
    pub async fn list_user_sessions(&self, user_id: UserId) -> Result<Vec<ReferenceToken>, SessionError> {
        let keys = self.store.scan_prefix(SESSION_KEY_PREFIX).await?;
        let mut tokens = Vec::new();
        for key in keys {
            let Some(token) = key
                .strip_prefix(SESSION_KEY_PREFIX)
                .and_then(ReferenceToken::parse)
            else {
                continue;
            };
            let raw = match self.store.get(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(err) => {
                    warn!(token = token.redacted(), error = %err, "skipping unreadable session");
                    continue;
                }
            };
            match serde_json::from_str::<SessionRecord>(&raw) {
                Ok(record) if record.user_id == user_id => tokens.push(token),
                Ok(_) => {}
                Err(err) => warn!(token = token.redacted(), error = %err, "skipping corrupt session"),
            }
        }
        Ok(tokens)
    }

    /// Best effort: keeps going past individual failures. Returns how many
    /// sessions were deleted.
    pub async fn delete_all_user_sessions(&self, user_id: UserId) -> Result<usize, SessionError> {
        let tokens = self.list_user_sessions(user_id).await?;
        let mut deleted = 0;
        for token in &tokens {
            match self.delete_session(token).await {
                Ok(()) => deleted += 1,
                Err(err) => warn!(token = token.redacted(), error = %err, "failed to revoke session"),
            }
        }
        debug!(%user_id, deleted, found = tokens.len(), "user sessions revoked");
        Ok(deleted)
    }

    async fn write(&self, token: &ReferenceToken, record: &SessionRecord, ttl: Duration) -> Result<(), SessionError> {
        let value = serde_json::to_string(record).map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.store.set(&Self::key(token), value, ttl).await?;
        Ok(())
    }
}

impl core::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use tenantgate_auth::{Permission, Role};
    use tenantgate_core::{RoleId, TenantId};
    use uuid::Uuid;

    use super::*;
    use crate::store::{InMemoryKeyValueStore, StoreError};

    const T0: i64 = 1_700_000_000;

    fn record(user_id: UserId) -> SessionRecord {
        SessionRecord {
            user_id,
            user_identity: Uuid::new_v4(),
            tenant_id: TenantId::new(),
            tenant_slug: "acme".into(),
            role_id: Some(RoleId::new()),
            roles: vec![Role::new("Viewer")],
            permissions: vec![Permission::new("portal:read")],
            scope: "portal:read".into(),
            email: "u1@example.com".into(),
            name: "U One".into(),
            issued_at: 0,
            expires_at: 0,
        }
    }

    fn manager() -> (SessionManager, Arc<InMemoryKeyValueStore>, Arc<AtomicI64>) {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let now = Arc::new(AtomicI64::new(T0));
        let clock = now.clone();
        let manager = SessionManager::new(store.clone(), Duration::from_secs(1800))
            .with_clock(move || clock.load(Ordering::SeqCst));
        (manager, store, now)
    }

    #[tokio::test]
    async fn create_then_get_returns_stamped_record() {
        let (sessions, _, _) = manager();
        let input = record(UserId::new());

        let token = sessions.create_session(input.clone()).await.unwrap();
        let stored = sessions.get_session(&token).await.unwrap();

        assert_eq!(stored.issued_at, T0);
        assert_eq!(stored.expires_at, T0 + 1800);
        assert_eq!(
            SessionRecord { issued_at: 0, expires_at: 0, ..stored },
            input
        );
    }

    #[tokio::test]
    async fn expired_record_reads_like_a_missing_one_and_is_evicted() {
        let (sessions, store, now) = manager();
        let token = sessions.create_session(record(UserId::new())).await.unwrap();

        now.store(T0 + 1800, Ordering::SeqCst);
        assert_eq!(sessions.get_session(&token).await, Err(SessionError::NotFound));
        assert_eq!(sessions.get_session(&token).await, Err(SessionError::NotFound));
        assert!(store.get(&SessionManager::key(&token)).await.unwrap().is_none());

        let never_issued = ReferenceToken::generate();
        assert_eq!(sessions.get_session(&never_issued).await, Err(SessionError::NotFound));
    }

    #[tokio::test]
    async fn refresh_strictly_extends_and_keeps_everything_else() {
        let (sessions, _, now) = manager();
        let token = sessions.create_session(record(UserId::new())).await.unwrap();
        let before = sessions.get_session(&token).await.unwrap();

        // Same second: still strictly increases.
        let same_second = sessions.refresh_session(&token).await.unwrap();
        assert!(same_second.expires_at > before.expires_at);

        now.store(T0 + 600, Ordering::SeqCst);
        let later = sessions.refresh_session(&token).await.unwrap();
        assert_eq!(later.expires_at, T0 + 600 + 1800);
        assert_eq!(
            SessionRecord { expires_at: 0, ..later },
            SessionRecord { expires_at: 0, ..before }
        );
    }

    #[tokio::test]
    async fn refresh_of_unknown_token_fails_like_get() {
        let (sessions, _, _) = manager();
        let err = sessions.refresh_session(&ReferenceToken::generate()).await;
        assert_eq!(err, Err(SessionError::NotFound));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (sessions, _, _) = manager();
        let token = sessions.create_session(record(UserId::new())).await.unwrap();

        sessions.delete_session(&token).await.unwrap();
        sessions.delete_session(&token).await.unwrap();
        assert_eq!(sessions.get_session(&token).await, Err(SessionError::NotFound));
    }

    #[tokio::test]
    async fn tenant_switch_keeps_remaining_lifetime() {
        let (sessions, store, now) = manager();
        let original = record(UserId::new());
        let token = sessions.create_session(original.clone()).await.unwrap();
        now.store(T0 + 900, Ordering::SeqCst);

        let other_tenant = TenantId::new();
        let updated = sessions
            .update_tenant_context(
                &token,
                TenantContextUpdate {
                    tenant_id: other_tenant,
                    tenant_slug: "globex".into(),
                    role_id: None,
                    roles: vec![Role::new("Tenant Owner")],
                    permissions: vec![Permission::new("portal:create")],
                    scope: "portal:create".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.tenant_id, other_tenant);
        assert_eq!(updated.expires_at, T0 + 1800);
        assert_eq!(updated.issued_at, T0);
        let ttl = store.ttl(&SessionManager::key(&token)).await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(1800));
        assert_eq!(sessions.get_session(&token).await.unwrap().tenant_slug, "globex");
    }

    #[tokio::test]
    async fn bulk_revocation_only_touches_one_user() {
        let (sessions, _, _) = manager();
        let alice = UserId::new();
        let bob = UserId::new();
        let a1 = sessions.create_session(record(alice)).await.unwrap();
        let a2 = sessions.create_session(record(alice)).await.unwrap();
        let b1 = sessions.create_session(record(bob)).await.unwrap();

        let mut listed = sessions.list_user_sessions(alice).await.unwrap();
        listed.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        let mut expected = vec![a1.clone(), a2.clone()];
        expected.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        assert_eq!(listed, expected);

        assert_eq!(sessions.delete_all_user_sessions(alice).await.unwrap(), 2);
        assert_eq!(sessions.get_session(&a1).await, Err(SessionError::NotFound));
        assert!(sessions.get_session(&b1).await.is_ok());
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_storage_error() {
        let (sessions, store, _) = manager();
        store.set_unavailable(true);
        let err = sessions.create_session(record(UserId::new())).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(StoreError::Unavailable(_))));
    }
}
