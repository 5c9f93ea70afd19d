//! Single-use random tokens bound to a value, kept in the shared store.
//!
//! Backs OAuth `state` nonces, email verification links and password reset
//! links. Redemption is an atomic take, so a token works at most once.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;

use crate::store::{KeyValueStore, StoreError};

#[derive(Clone)]
pub struct OneTimeTokens {
    store: Arc<dyn KeyValueStore>,
    prefix: &'static str,
    bytes: usize,
    ttl: Duration,
}

impl OneTimeTokens {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: &'static str, bytes: usize, ttl: Duration) -> Self {
        Self { store, prefix, bytes, ttl }
    }

    /// Mint a hex token of `bytes` random bytes that redeems to `value`.
    pub async fn issue(&self, value: &str) -> Result<String, StoreError> {
        let mut raw = vec![0u8; self.bytes];
        rand::rngs::OsRng.fill_bytes(&mut raw);
        let token = hex::encode(raw);
        self.store.set(&self.key(&token), value.to_string(), self.ttl).await?;
        Ok(token)
    }

    /// `None` for unknown, replayed, expired and malformed tokens alike.
    /// Malformed tokens never reach the store.
    pub async fn redeem(&self, token: &str) -> Result<Option<String>, StoreError> {
        if !self.well_formed(token) {
            return Ok(None);
        }
        self.store.take(&self.key(token)).await
    }

    fn well_formed(&self, token: &str) -> bool {
        token.len() == self.bytes * 2 && token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    fn key(&self, token: &str) -> String {
        format!("{}{token}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKeyValueStore;

    #[tokio::test]
    async fn tokens_are_namespaced_and_single_use() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let tokens = OneTimeTokens::new(store.clone(), "verify_email:", 32, Duration::from_secs(60));

        let token = tokens.issue("user-1").await.unwrap();
        assert_eq!(token.len(), 64);
        assert_eq!(store.scan_prefix("verify_email:").await.unwrap().len(), 1);

        assert_eq!(tokens.redeem(&token).await.unwrap().as_deref(), Some("user-1"));
        assert_eq!(tokens.redeem(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn wrong_length_is_rejected_without_a_lookup() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let tokens = OneTimeTokens::new(store.clone(), "reset_password:", 32, Duration::from_secs(60));
        let before = store.operations();

        assert_eq!(tokens.redeem("abcd").await.unwrap(), None);
        assert_eq!(tokens.redeem(&"Z".repeat(64)).await.unwrap(), None);
        assert_eq!(store.operations(), before);
    }
}
