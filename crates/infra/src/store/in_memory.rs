use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{KeyValueStore, StoreError};

/// In-memory TTL store for tests/dev.
///
/// Expired entries are dropped lazily on access. `set_unavailable` and
/// `operations` exist for tests that assert failure handling or that a path
/// never reached storage.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    inner: RwLock<HashMap<String, Entry>>,
    unavailable: AtomicBool,
    operations: AtomicU64,
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of calls that reached the store.
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store marked unavailable".into()));
        }
        Ok(())
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("in-memory store lock poisoned".into())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        self.enter()?;
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        map.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.enter()?;
        let now = Instant::now();
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(key).filter(|e| e.is_live(now)).map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.enter()?;
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        map.remove(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        self.enter()?;
        let now = Instant::now();
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.expires_at.saturating_duration_since(now)))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.enter()?;
        let now = Instant::now();
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        map.retain(|_, e| e.is_live(now));
        Ok(map.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.enter()?;
        let now = Instant::now();
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        Ok(map.remove(key).filter(|e| e.is_live(now)).map(|e| e.value))
    }
}
