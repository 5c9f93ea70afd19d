//! One-shot OAuth `state` nonces kept in the shared store.

use std::sync::Arc;
use std::time::Duration;

use super::OneTimeTokens;
use crate::error::ServiceError;
use crate::store::KeyValueStore;

const STATE_KEY_PREFIX: &str = "oauth_state:";
const STATE_BYTES: usize = 16;

#[derive(Clone)]
pub struct OAuthStateStore {
    tokens: OneTimeTokens,
}

impl OAuthStateStore {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            tokens: OneTimeTokens::new(store, STATE_KEY_PREFIX, STATE_BYTES, ttl),
        }
    }

    /// Mint a 128-bit nonce bound to `app_id`.
    pub async fn issue(&self, app_id: &str) -> Result<String, ServiceError> {
        Ok(self.tokens.issue(app_id).await?)
    }

    /// Redeem a nonce exactly once. Unknown, replayed and expired states all
    /// fail the same way.
    pub async fn consume(&self, state: &str) -> Result<String, ServiceError> {
        self.tokens.redeem(state).await?.ok_or(ServiceError::InvalidOAuthState)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKeyValueStore;

    fn states(ttl: Duration) -> (OAuthStateStore, Arc<InMemoryKeyValueStore>) {
        let store = Arc::new(InMemoryKeyValueStore::new());
        (OAuthStateStore::new(store.clone(), ttl), store)
    }

    #[tokio::test]
    async fn state_redeems_once() {
        let (states, _) = states(Duration::from_secs(600));
        let state = states.issue("portal").await.unwrap();

        assert_eq!(states.consume(&state).await.unwrap(), "portal");
        assert_eq!(states.consume(&state).await, Err(ServiceError::InvalidOAuthState));
    }

    #[tokio::test]
    async fn malformed_state_never_reaches_the_store() {
        let (states, store) = states(Duration::from_secs(600));
        let before = store.operations();
        assert_eq!(states.consume("not-a-state").await, Err(ServiceError::InvalidOAuthState));
        assert_eq!(store.operations(), before);
    }

    #[tokio::test]
    async fn expired_state_is_rejected() {
        let (states, _) = states(Duration::from_millis(20));
        let state = states.issue("portal").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(states.consume(&state).await, Err(ServiceError::InvalidOAuthState));
    }
}
