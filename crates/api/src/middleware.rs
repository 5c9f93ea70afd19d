use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use tenantgate_auth::{extract_bearer, select_mode, AuthContext, HeaderSource, ReferenceToken, SessionRecord};
use tenantgate_infra::{parse_session_token, ServiceError};

use crate::app::errors::service_error_to_response;
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, SessionContext, TenantContext};

/// Adapter so the auth protocol can read axum headers.
pub struct RequestHeaders<'a>(pub &'a HeaderMap);

impl HeaderSource for RequestHeaders<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Dual-mode authentication for protected routes.
pub async fn auth_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let headers = RequestHeaders(req.headers());
    let mode = select_mode(&headers);
    let ctx = match services.authenticator.authenticate(&headers).await {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::debug!(?mode, error = %err, "request rejected");
            return service_error_to_response(err);
        }
    };

    insert_auth(&mut req, ctx);
    next.run(req).await
}

/// Phantom-token authentication for routes that manage the session itself.
///
/// These never accept gateway headers: the token has to be in hand.
pub async fn session_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let (token, record) = match resolve_session(&services, req.headers()).await {
        Ok(pair) => pair,
        Err(err) => return service_error_to_response(err),
    };

    insert_auth(&mut req, record.auth_context());
    req.extensions_mut().insert(SessionContext { token, record });
    next.run(req).await
}

async fn resolve_session(
    services: &AppServices,
    headers: &HeaderMap,
) -> Result<(ReferenceToken, SessionRecord), ServiceError> {
    let request_headers = RequestHeaders(headers);
    let raw = extract_bearer(&request_headers)?;
    let token = parse_session_token(raw)?;
    match services.auth.session_context(&token).await {
        Ok(record) => Ok((token, record)),
        Err(ServiceError::NotFound(_)) => Err(ServiceError::Unauthenticated("session expired or revoked".into())),
        Err(err) => Err(err),
    }
}

fn insert_auth(req: &mut Request<axum::body::Body>, ctx: AuthContext) {
    req.extensions_mut().insert(TenantContext::new(ctx.tenant_id));
    req.extensions_mut().insert(PrincipalContext::new(ctx));
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive_and_skips_non_ascii() {
        let mut map = HeaderMap::new();
        map.insert("X-Authenticated", HeaderValue::from_static("true"));
        map.insert("x-role-name", HeaderValue::from_bytes(b"\xffbad").unwrap());

        let headers = RequestHeaders(&map);
        assert_eq!(headers.header("x-authenticated"), Some("true"));
        assert_eq!(headers.header("x-role-name"), None);
        assert_eq!(headers.header("x-user-id"), None);
    }
}
