use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use tenantgate_auth::gateway::headers;

use crate::app::services::AppServices;

/// Always 200. Active results also carry the identity headers the gateway
/// forwards downstream.
pub async fn introspect(Extension(services): Extension<Arc<AppServices>>, request_headers: HeaderMap) -> Response {
    let raw = request_headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let result = services.introspection.introspect(raw).await;

    let mut response = (StatusCode::OK, Json(&result)).into_response();
    for (name, value) in result.upstream_headers() {
        if name == headers::AUTHENTICATED {
            continue;
        }
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().insert(HeaderName::from_static(name), value);
        }
    }
    response
}
