//! OAuth callback flow: state nonce, code exchange, external login.
//!
//! Provider protocol details stay behind [`IdentityProvider`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::auth_service::{AuthService, ExternalIdentity, LoginOutcome};
use crate::error::ServiceError;
use crate::session::OAuthStateStore;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an authorization code for the identity it asserts.
    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, ServiceError>;
}

#[derive(Clone)]
pub struct OAuthService {
    states: OAuthStateStore,
    providers: HashMap<String, Arc<dyn IdentityProvider>>,
    auth: AuthService,
}

impl OAuthService {
    pub fn new(states: OAuthStateStore, auth: AuthService) -> Self {
        Self {
            states,
            providers: HashMap::new(),
            auth,
        }
    }

    pub fn with_provider(mut self, name: impl Into<String>, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }

    pub async fn begin(&self, app_id: &str) -> Result<String, ServiceError> {
        self.states.issue(app_id).await
    }

    /// The state is spent before anything else happens, so a replayed
    /// callback fails even if the provider is down.
    pub async fn callback(&self, provider: &str, code: &str, state: &str) -> Result<LoginOutcome, ServiceError> {
        let app_id = self.states.consume(state).await?;
        let idp = self.providers.get(provider).ok_or_else(|| {
            ServiceError::UpstreamUnavailable(format!("identity provider '{provider}' is not configured"))
        })?;
        let identity = idp.exchange_code(code).await?;
        info!(provider, app_id = %app_id, "oauth callback accepted");
        self.auth.login_external(identity, None).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::Fixture;

    struct Static(ExternalIdentity);

    #[async_trait]
    impl IdentityProvider for Static {
        async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, ServiceError> {
            if code == "good-code" {
                Ok(self.0.clone())
            } else {
                Err(ServiceError::Unauthenticated("code rejected".into()))
            }
        }
    }

    async fn service(fx: &Fixture) -> OAuthService {
        let user = fx.user("u1@example.com").await;
        let tenant = fx.tenant("Tenant One").await;
        fx.join(user.id, tenant.id, "Viewer").await;
        let identity = ExternalIdentity {
            provider: "google".into(),
            provider_id: "g-1".into(),
            email: "u1@example.com".into(),
            name: "U One".into(),
        };
        OAuthService::new(OAuthStateStore::new(fx.store.clone(), Duration::from_secs(600)), fx.auth_service())
            .with_provider("google", Arc::new(Static(identity)))
    }

    #[tokio::test]
    async fn callback_logs_in_and_burns_the_state() {
        let fx = Fixture::new().await;
        let oauth = service(&fx).await;
        let state = oauth.begin("portal").await.unwrap();

        let outcome = oauth.callback("google", "good-code", &state).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::Success(_)));

        let replay = oauth.callback("google", "good-code", &state).await;
        assert_eq!(replay.unwrap_err(), ServiceError::InvalidOAuthState);
    }

    #[tokio::test]
    async fn unknown_provider_is_an_upstream_failure() {
        let fx = Fixture::new().await;
        let oauth = service(&fx).await;
        let state = oauth.begin("portal").await.unwrap();

        let err = oauth.callback("github", "good-code", &state).await.unwrap_err();
        assert!(matches!(err, ServiceError::UpstreamUnavailable(_)));
    }
}
