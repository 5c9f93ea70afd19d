//! Request authentication: gateway-injected headers or a bearer credential.

use std::sync::Arc;

use tenantgate_auth::{
    extract_bearer, parse_trusted_headers, select_mode, AuthContext, AuthError, AuthMode, HeaderSource,
    ReferenceToken, SignedCredentialVerifier,
};

use crate::error::ServiceError;
use crate::session::{SessionError, SessionManager};

/// How bearer credentials are checked when no gateway headers are trusted.
#[derive(Clone)]
pub enum BearerBackend {
    /// Phantom tokens looked up in the session store.
    Sessions(SessionManager),
    /// Self-contained signed credentials verified locally.
    Signed(Arc<dyn SignedCredentialVerifier>),
}

#[derive(Clone)]
pub struct RequestAuthenticator {
    bearer: BearerBackend,
}

impl RequestAuthenticator {
    pub fn new(bearer: BearerBackend) -> Self {
        Self { bearer }
    }

    /// Mode is picked fresh for every request.
    pub async fn authenticate<H>(&self, source: &H) -> Result<AuthContext, ServiceError>
    where
        H: HeaderSource + Sync + ?Sized,
    {
        match select_mode(source) {
            AuthMode::HeaderTrust => Ok(parse_trusted_headers(source)?),
            AuthMode::Bearer => {
                let raw = extract_bearer(source)?.to_string();
                self.authenticate_bearer(&raw).await
            }
        }
    }

    pub async fn authenticate_bearer(&self, raw: &str) -> Result<AuthContext, ServiceError> {
        match &self.bearer {
            BearerBackend::Sessions(sessions) => {
                let token = parse_session_token(raw)?;
                match sessions.get_session(&token).await {
                    Ok(record) => Ok(record.auth_context()),
                    Err(SessionError::NotFound) => {
                        Err(AuthError::Unauthenticated("session not found or expired").into())
                    }
                    Err(err) => Err(err.into()),
                }
            }
            BearerBackend::Signed(verifier) => Ok(verifier.verify(raw, chrono::Utc::now())?),
        }
    }
}

/// Shape-check a bearer value as a phantom token.
pub fn parse_session_token(raw: &str) -> Result<ReferenceToken, ServiceError> {
    ReferenceToken::parse(raw).ok_or_else(|| AuthError::Unauthenticated("malformed session token").into())
}

#[cfg(test)]
mod tests {
    use tenantgate_auth::gateway::headers;
    use tenantgate_auth::Hs256Verifier;

    use super::*;
    use crate::auth_service::LoginOutcome;
    use crate::introspection::IntrospectionService;
    use crate::testing::{Fixture, TestHeaders, PASSWORD};

    async fn logged_in(fx: &Fixture) -> String {
        let user = fx.user("u1@example.com").await;
        let tenant = fx.tenant("Tenant One").await;
        fx.join(user.id, tenant.id, "Tenant Owner").await;
        match fx.auth_service().login("u1@example.com", PASSWORD, None).await.unwrap() {
            LoginOutcome::Success(s) => s.access_token,
            LoginOutcome::TenantChoice(_) => panic!("expected a session"),
        }
    }

    #[tokio::test]
    async fn introspected_headers_authenticate_like_the_bearer_token() {
        let fx = Fixture::new().await;
        let token = logged_in(&fx).await;
        let authenticator = RequestAuthenticator::new(BearerBackend::Sessions(fx.sessions()));

        let via_bearer = authenticator
            .authenticate(&TestHeaders::new().with(headers::AUTHORIZATION, &format!("Bearer {token}")))
            .await
            .unwrap();

        let introspected = IntrospectionService::new(fx.sessions()).introspect(&token).await;
        let mut injected = TestHeaders::new();
        for (name, value) in introspected.upstream_headers() {
            injected = injected.with(name, &value);
        }
        let via_headers = authenticator.authenticate(&injected).await.unwrap();

        assert_eq!(via_headers, via_bearer);
    }

    #[tokio::test]
    async fn trust_marker_beats_a_bearer_token() {
        let fx = Fixture::new().await;
        let authenticator = RequestAuthenticator::new(BearerBackend::Sessions(fx.sessions()));
        let request = TestHeaders::new()
            .with(headers::AUTHENTICATED, "true")
            .with(headers::USER_ID, "not-a-uuid")
            .with(headers::TENANT_ID, &tenantgate_core::TenantId::new().to_string())
            .with(headers::AUTHORIZATION, &format!("Bearer {}", ReferenceToken::generate().as_str()));

        assert!(matches!(authenticator.authenticate(&request).await, Err(ServiceError::BadRequest(_))));
    }

    #[tokio::test]
    async fn missing_or_unknown_bearer_is_unauthenticated() {
        let fx = Fixture::new().await;
        let authenticator = RequestAuthenticator::new(BearerBackend::Sessions(fx.sessions()));

        let none = authenticator.authenticate(&TestHeaders::new()).await;
        assert!(matches!(none, Err(ServiceError::Unauthenticated(_))));

        let unknown = TestHeaders::new().with(headers::AUTHORIZATION, &format!("Bearer {}", ReferenceToken::generate().as_str()));
        assert!(matches!(authenticator.authenticate(&unknown).await, Err(ServiceError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn signed_backend_rejects_garbage() {
        let authenticator = RequestAuthenticator::new(BearerBackend::Signed(Arc::new(Hs256Verifier::new(b"secret"))));
        let request = TestHeaders::new().with(headers::AUTHORIZATION, "Bearer not.a.jwt");
        assert!(matches!(authenticator.authenticate(&request).await, Err(ServiceError::Unauthenticated(_))));
    }
}
