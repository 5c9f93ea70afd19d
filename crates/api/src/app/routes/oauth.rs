use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::app::dto::{OAuthCallbackQuery, OAuthStateRequest, OAuthStateResponse};
use crate::app::errors::{json_error, service_error_to_response};
use crate::app::services::AppServices;

pub async fn issue_state(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<OAuthStateRequest>,
) -> Response {
    if body.app_id.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "validation_error", "app_id is required");
    }
    match services.oauth.begin(&body.app_id).await {
        Ok(state) => (StatusCode::CREATED, Json(OAuthStateResponse { state })).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn callback(
    Extension(services): Extension<Arc<AppServices>>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Response {
    match services.oauth.callback(&provider, &query.code, &query.state).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}
