use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::app::dto::{LoginRequest, RefreshResponse, RevokeResponse, SelectTenantRequest, SessionResponse, SwitchTenantRequest};
use crate::app::errors::service_error_to_response;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> Response {
    match services.auth.login(&body.email, &body.password, body.tenant_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn select_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<SelectTenantRequest>,
) -> Response {
    match services.auth.select_tenant(&body.email, &body.password, body.tenant_id).await {
        Ok(success) => (StatusCode::OK, Json(success)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    match services.auth.logout(&session.token).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "message": "logged out" }))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    match services.auth.refresh(&session.token).await {
        Ok(record) => (
            StatusCode::OK,
            Json(RefreshResponse {
                expires_at: record.expires_at,
            }),
        )
            .into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn switch_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<SwitchTenantRequest>,
) -> Response {
    match services.auth.switch_tenant(&session.token, body.tenant_id).await {
        Ok(record) => (StatusCode::OK, Json(SessionResponse::from(&record))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn session(Extension(session): Extension<SessionContext>) -> Response {
    (StatusCode::OK, Json(SessionResponse::from(&session.record))).into_response()
}

/// Revoke every session of the caller, this one included.
pub async fn revoke_all(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    match services.auth.revoke_all(session.record.user_id).await {
        Ok(revoked) => (StatusCode::OK, Json(RevokeResponse { revoked })).into_response(),
        Err(e) => service_error_to_response(e),
    }
}
