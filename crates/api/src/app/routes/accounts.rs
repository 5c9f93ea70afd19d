use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use tenantgate_core::UserId;

use crate::app::dto::{
    ChangePasswordRequest, ChangeStatusRequest, EmailRequest, ResetPasswordRequest, UpdateProfileRequest,
    UserResponse, VerifyEmailRequest,
};
use crate::app::errors::service_error_to_response;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Accepted whether or not the address belongs to an account.
fn accepted() -> Response {
    (StatusCode::ACCEPTED, Json(serde_json::json!({ "message": "if the account exists, an email is on its way" })))
        .into_response()
}

pub async fn resend_verification(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<EmailRequest>,
) -> Response {
    match services.accounts.request_verification(&body.email).await {
        Ok(()) => accepted(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn verify_email(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<VerifyEmailRequest>,
) -> Response {
    match services.accounts.verify_email(&body.token).await {
        Ok(user) => (StatusCode::OK, Json(UserResponse::from(user))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<EmailRequest>,
) -> Response {
    match services.accounts.request_password_reset(&body.email).await {
        Ok(()) => accepted(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ResetPasswordRequest>,
) -> Response {
    match services.accounts.reset_password(&body.token, &body.new_password).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "message": "password reset" }))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<UpdateProfileRequest>,
) -> Response {
    match services.accounts.update_profile(principal.user_id(), &body.name).await {
        Ok(user) => (StatusCode::OK, Json(UserResponse::from(user))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<ChangePasswordRequest>,
) -> Response {
    match services
        .accounts
        .change_password(principal.user_id(), &body.current_password, &body.new_password)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(user_id): Path<UserId>,
    Json(body): Json<ChangeStatusRequest>,
) -> Response {
    match services
        .accounts
        .change_status(principal.user_id(), user_id, body.is_active)
        .await
    {
        Ok(user) => (StatusCode::OK, Json(UserResponse::from(user))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(user_id): Path<UserId>,
) -> Response {
    match services.accounts.delete_user(principal.user_id(), user_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => service_error_to_response(e),
    }
}
