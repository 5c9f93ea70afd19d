//! Redis-backed key-value store.
//!
//! Uses a multiplexed `ConnectionManager` (reconnects transparently) and wraps
//! every command in the configured deadline.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::instrument;

use super::{KeyValueStore, StoreError};
use crate::deadline::within;

const SCAN_BATCH: usize = 200;

#[derive(Clone)]
pub struct RedisKeyValueStore {
    conn: ConnectionManager,
    deadline: Duration,
}

impl RedisKeyValueStore {
    /// Connect to `redis_url` (e.g. "redis://localhost:6379/0").
    pub async fn connect(redis_url: &str, deadline: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(map_redis_error)?;
        let conn = within(deadline, "redis_connect", async {
            ConnectionManager::new(client).await.map_err(map_redis_error)
        })
        .await?;
        Ok(Self { conn, deadline })
    }

    async fn run<T>(&self, operation: &'static str, cmd: redis::Cmd) -> Result<T, StoreError>
    where
        T: redis::FromRedisValue + Send,
    {
        let mut conn = self.conn.clone();
        within(self.deadline, operation, async move {
            cmd.query_async::<_, T>(&mut conn).await.map_err(map_redis_error)
        })
        .await
    }
}

fn map_redis_error(err: redis::RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    #[instrument(skip(self, key, value), err)]
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl.as_millis().max(1) as u64);
        self.run("redis_set", cmd).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run("redis_get", cmd).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.run::<i64>("redis_del", cmd).await.map(|_| ())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut cmd = redis::cmd("PTTL");
        cmd.arg(key);
        // -2: no such key, -1: no expiry.
        let millis: i64 = self.run("redis_pttl", cmd).await?;
        Ok((millis >= 0).then(|| Duration::from_millis(millis as u64)))
    }

    #[instrument(skip(self), err)]
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let pattern = format!("{prefix}*");
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor).arg("MATCH").arg(&pattern).arg("COUNT").arg(SCAN_BATCH);
            let (next, batch): (u64, Vec<String>) = self.run("redis_scan", cmd).await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut cmd = redis::cmd("GETDEL");
        cmd.arg(key);
        self.run("redis_getdel", cmd).await
    }
}
