//! Token introspection for the upstream gateway.

use tracing::debug;

use tenantgate_auth::{strip_bearer_prefix, IntrospectionResult, ReferenceToken};

use crate::session::SessionManager;

/// Exchanges a phantom token for its session context.
///
/// Every failure collapses into `{active: false}`: the caller sits on the
/// other side of a trust boundary and learns nothing else.
#[derive(Clone, Debug)]
pub struct IntrospectionService {
    sessions: SessionManager,
}

impl IntrospectionService {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    /// `raw` may still carry its `Bearer ` prefix.
    pub async fn introspect(&self, raw: &str) -> IntrospectionResult {
        let Some(token) = ReferenceToken::parse(strip_bearer_prefix(raw)) else {
            return IntrospectionResult::inactive();
        };
        match self.sessions.get_session(&token).await {
            Ok(record) => IntrospectionResult::from_session(&record),
            Err(err) => {
                debug!(token = token.redacted(), error = %err, "introspection inactive");
                IntrospectionResult::inactive()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_service::LoginOutcome;
    use crate::testing::{Fixture, PASSWORD};

    #[tokio::test]
    async fn malformed_tokens_never_touch_the_store() {
        let fx = Fixture::new().await;
        let service = IntrospectionService::new(fx.sessions());
        let before = fx.store.operations();

        for raw in ["", "Bearer ", "ref_short", "jwt.looking.token", &format!("ref_{}", "G".repeat(64))] {
            assert_eq!(service.introspect(raw).await, IntrospectionResult::inactive(), "{raw:?}");
        }
        assert_eq!(fx.store.operations(), before);
    }

    #[tokio::test]
    async fn live_session_is_active_with_or_without_prefix() {
        let fx = Fixture::new().await;
        let user = fx.user("u1@example.com").await;
        let tenant = fx.tenant("Tenant One").await;
        fx.join(user.id, tenant.id, "Viewer").await;
        let LoginOutcome::Success(login) = fx.auth_service().login("u1@example.com", PASSWORD, None).await.unwrap() else {
            panic!("expected a session");
        };
        let service = IntrospectionService::new(fx.sessions());

        let bare = service.introspect(&login.access_token).await;
        let prefixed = service.introspect(&format!("Bearer {}", login.access_token)).await;
        assert_eq!(bare, prefixed);
        assert!(bare.active);
        let ctx = bare.context.unwrap();
        assert_eq!(ctx.user_id, user.id);
        assert_eq!(ctx.sub, format!("user_{}", user.id));
        assert_eq!(ctx.role_name.as_deref(), Some("Viewer"));
    }

    #[tokio::test]
    async fn unknown_or_unreachable_sessions_are_inactive() {
        let fx = Fixture::new().await;
        let service = IntrospectionService::new(fx.sessions());
        let token = ReferenceToken::generate();

        assert_eq!(service.introspect(token.as_str()).await, IntrospectionResult::inactive());
        fx.store.set_unavailable(true);
        assert_eq!(service.introspect(token.as_str()).await, IntrospectionResult::inactive());
    }
}
