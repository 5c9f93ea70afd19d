//! Consumer records in the upstream API gateway's admin API.
//!
//! This is the one provisioning side effect outside the directory
//! transaction, so the registration saga compensates it by hand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::deadline::{within, DeadlineError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsumerRegistryError {
    #[error("consumer registry rejected request [{status}]: {message}")]
    Rejected { status: u16, message: String },

    #[error("consumer registry unavailable: {0}")]
    Unavailable(String),

    #[error("consumer registry call '{operation}' timed out after {after_ms}ms")]
    Timeout { operation: &'static str, after_ms: u64 },
}

impl DeadlineError for ConsumerRegistryError {
    fn deadline_exceeded(operation: &'static str, after: Duration) -> Self {
        ConsumerRegistryError::Timeout {
            operation,
            after_ms: after.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerRequest {
    /// Stable external identity of the user.
    pub username: String,
    pub custom_id: String,
    pub tags: Vec<String>,
}

impl ConsumerRequest {
    pub fn for_portal_user(identity: &uuid::Uuid, user_id: &tenantgate_core::UserId, tenant_slug: &str) -> Self {
        Self {
            username: identity.to_string(),
            custom_id: user_id.to_string(),
            tags: vec!["portal-user".to_string(), format!("tenant:{tenant_slug}")],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayConsumer {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[async_trait]
pub trait ConsumerRegistry: Send + Sync {
    async fn create_consumer(&self, request: &ConsumerRequest) -> Result<GatewayConsumer, ConsumerRegistryError>;

    /// Deleting an unknown consumer succeeds.
    async fn delete_consumer(&self, id_or_username: &str) -> Result<(), ConsumerRegistryError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP admin API
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AdminApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct HttpConsumerRegistry {
    client: reqwest::Client,
    base_url: String,
    deadline: Duration,
}

impl HttpConsumerRegistry {
    pub fn new(base_url: impl Into<String>, deadline: Duration) -> Result<Self, ConsumerRegistryError> {
        let client = reqwest::Client::builder()
            .timeout(deadline)
            .build()
            .map_err(|e| ConsumerRegistryError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            deadline,
        })
    }

    async fn rejection(response: reqwest::Response) -> ConsumerRegistryError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AdminApiError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        ConsumerRegistryError::Rejected { status, message }
    }
}

fn transport(err: reqwest::Error) -> ConsumerRegistryError {
    ConsumerRegistryError::Unavailable(err.to_string())
}

#[async_trait]
impl ConsumerRegistry for HttpConsumerRegistry {
    async fn create_consumer(&self, request: &ConsumerRequest) -> Result<GatewayConsumer, ConsumerRegistryError> {
        let url = format!("{}/consumers", self.base_url);
        within(self.deadline, "create_consumer", async {
            let response = self.client.post(&url).json(request).send().await.map_err(transport)?;
            if response.status() != StatusCode::CREATED {
                return Err(Self::rejection(response).await);
            }
            let consumer: GatewayConsumer = response.json().await.map_err(transport)?;
            debug!(consumer_id = %consumer.id, "gateway consumer created");
            Ok(consumer)
        })
        .await
    }

    async fn delete_consumer(&self, id_or_username: &str) -> Result<(), ConsumerRegistryError> {
        let url = format!("{}/consumers/{}", self.base_url, id_or_username);
        within(self.deadline, "delete_consumer", async {
            let response = self.client.delete(&url).send().await.map_err(transport)?;
            match response.status() {
                StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(()),
                _ => Err(Self::rejection(response).await),
            }
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory registry (dev + tests)
// ─────────────────────────────────────────────────────────────────────────────

/// Registry kept in process memory, with failure knobs for saga tests.
#[derive(Debug, Default)]
pub struct InMemoryConsumerRegistry {
    consumers: Mutex<HashMap<String, GatewayConsumer>>,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
    delete_calls: AtomicUsize,
}

impl InMemoryConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, username: &str) -> bool {
        self.consumers
            .lock()
            .map(|c| c.values().any(|v| v.username == username))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.consumers.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn poisoned() -> ConsumerRegistryError {
        ConsumerRegistryError::Unavailable("in-memory registry lock poisoned".into())
    }
}

#[async_trait]
impl ConsumerRegistry for InMemoryConsumerRegistry {
    async fn create_consumer(&self, request: &ConsumerRequest) -> Result<GatewayConsumer, ConsumerRegistryError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ConsumerRegistryError::Unavailable("registry marked unavailable".into()));
        }
        let mut consumers = self.consumers.lock().map_err(|_| Self::poisoned())?;
        if consumers.values().any(|c| c.username == request.username) {
            return Err(ConsumerRegistryError::Rejected {
                status: 409,
                message: format!("unique constraint violation: username '{}'", request.username),
            });
        }
        let consumer = GatewayConsumer {
            id: uuid::Uuid::new_v4().to_string(),
            username: request.username.clone(),
            custom_id: Some(request.custom_id.clone()),
            tags: request.tags.clone(),
        };
        consumers.insert(consumer.id.clone(), consumer.clone());
        Ok(consumer)
    }

    async fn delete_consumer(&self, id_or_username: &str) -> Result<(), ConsumerRegistryError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ConsumerRegistryError::Unavailable("registry marked unavailable".into()));
        }
        let mut consumers = self.consumers.lock().map_err(|_| Self::poisoned())?;
        consumers.retain(|id, c| id != id_or_username && c.username != id_or_username);
        Ok(())
    }
}
