//! Fire-and-forget user notifications.
//!
//! Dispatch never blocks the request path and failures never reach the
//! caller; they are logged as `notification_dropped`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use tenantgate_core::UserId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Welcome {
        user_id: UserId,
        email: String,
        tenant_name: String,
    },
    /// Carries the single-use token for the verification link.
    VerificationRequested {
        user_id: UserId,
        email: String,
        token: String,
    },
    PasswordResetRequested {
        user_id: UserId,
        email: String,
        token: String,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Welcome { .. } => "welcome",
            Notification::VerificationRequested { .. } => "verification_requested",
            Notification::PasswordResetRequested { .. } => "password_reset_requested",
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            Notification::Welcome { user_id, .. }
            | Notification::VerificationRequested { user_id, .. }
            | Notification::PasswordResetRequested { user_id, .. } => *user_id,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Default notifier: records the notification in the log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(kind = notification.kind(), user_id = %notification.user_id(), "notification queued");
        Ok(())
    }
}

/// Spawn delivery in the background.
pub fn dispatch(notifier: &Arc<dyn Notifier>, notification: Notification) {
    let notifier = notifier.clone();
    tokio::spawn(async move {
        let kind = notification.kind();
        let user_id = notification.user_id();
        if let Err(err) = notifier.notify(notification).await {
            warn!(event = "notification_dropped", kind, %user_id, error = %err, "notification dropped");
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct Failing {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _notification: Notification) -> Result<(), NotifyError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError("smtp down".into()))
        }
    }

    #[tokio::test]
    async fn failed_delivery_is_swallowed() {
        let failing = Arc::new(Failing::default());
        let notifier: Arc<dyn Notifier> = failing.clone();

        dispatch(
            &notifier,
            Notification::VerificationRequested {
                user_id: UserId::new(),
                email: "u1@example.com".into(),
                token: "0".repeat(64),
            },
        );

        for _ in 0..50 {
            if failing.attempts.load(Ordering::SeqCst) == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("notification was never attempted");
    }
}
