use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tenantgate_auth::AuthzError;
use tenantgate_infra::ServiceError;

/// One status class per error kind. Internal detail never reaches the body.
pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
        ServiceError::Unauthenticated(msg) => json_error(StatusCode::UNAUTHORIZED, "unauthenticated", msg),
        ServiceError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid email or password",
        ),
        ServiceError::Expired => json_error(StatusCode::UNAUTHORIZED, "expired", "session or token has expired"),
        ServiceError::InvalidOAuthState => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_oauth_state",
            "invalid or expired oauth state",
        ),
        ServiceError::UserInactive => json_error(StatusCode::FORBIDDEN, "user_inactive", "user account is inactive"),
        ServiceError::Authorization(e) => {
            let code = match e {
                AuthzError::NoTenantAccess => "no_tenant_access",
                AuthzError::TenantMismatch => "tenant_isolation",
                _ => "forbidden",
            };
            json_error(StatusCode::FORBIDDEN, code, e.to_string())
        }
        ServiceError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::StorageUnavailable(msg) => {
            tracing::warn!(error = %msg, "storage unavailable");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "storage_unavailable",
                "storage temporarily unavailable",
            )
        }
        ServiceError::UpstreamUnavailable(msg) => {
            tracing::warn!(error = %msg, "upstream unavailable");
            json_error(StatusCode::BAD_GATEWAY, "upstream_unavailable", "upstream service unavailable")
        }
        ServiceError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use tenantgate_core::TenantId;

    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ServiceError::InvalidOAuthState, StatusCode::UNAUTHORIZED),
            (ServiceError::UserInactive, StatusCode::FORBIDDEN),
            (AuthzError::NotAdmin(TenantId::new()).into(), StatusCode::FORBIDDEN),
            (ServiceError::NotFound("user"), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("dup".into()), StatusCode::CONFLICT),
            (ServiceError::StorageUnavailable("redis".into()), StatusCode::SERVICE_UNAVAILABLE),
            (ServiceError::UpstreamUnavailable("kong".into()), StatusCode::BAD_GATEWAY),
            (ServiceError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }
}
