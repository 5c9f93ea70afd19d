use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use tenantgate_infra::Registration;

use crate::app::errors::service_error_to_response;
use crate::app::services::AppServices;

/// Self-service signup: a new user who owns a new tenant.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<Registration>,
) -> Response {
    match services.registration.register(body).await {
        Ok(registered) => (StatusCode::CREATED, Json(registered)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}
