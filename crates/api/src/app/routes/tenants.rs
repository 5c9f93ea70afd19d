use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use tenantgate_auth::{authorize, Permission};
use tenantgate_core::{MembershipId, TenantId, UserId};
use tenantgate_infra::ServiceError;

use crate::app::dto::{
    AssignMemberRequest, CreateUserRequest, UserResponse, MembershipResponse, RolesQuery, TenantResponse,
    UpdateRoleRequest, UpdateTenantRequest,
};
use crate::app::errors::service_error_to_response;
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

const CREATE_USERS: &str = "portal:create";

pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    match services.admin.get_user_profile(principal.user_id()).await {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

/// Invite a user. The account starts with no memberships.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CreateUserRequest>,
) -> Response {
    if let Err(e) = authorize(principal.auth(), tenant.tenant_id(), &Permission::new(CREATE_USERS)) {
        return service_error_to_response(ServiceError::from(e));
    }
    match services.admin.create_user(&body.name, &body.email, &body.password).await {
        Ok(user) => (StatusCode::CREATED, Json(UserResponse::from(user))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(tenant_id): Path<TenantId>,
) -> Response {
    match services.admin.get_tenant_members(principal.user_id(), tenant_id).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn assign_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(tenant_id): Path<TenantId>,
    Json(body): Json<AssignMemberRequest>,
) -> Response {
    match services
        .admin
        .assign_user_to_tenant(principal.user_id(), body.user_id, tenant_id, body.role_id)
        .await
    {
        Ok(membership) => (StatusCode::CREATED, Json(MembershipResponse::from(membership))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn remove_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((tenant_id, user_id)): Path<(TenantId, UserId)>,
) -> Response {
    match services
        .admin
        .remove_user_from_tenant(principal.user_id(), user_id, tenant_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<RolesQuery>,
) -> Response {
    match services
        .admin
        .get_tenant_roles(principal.user_id(), tenant_id, query.include_permissions)
        .await
    {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn update_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(tenant_id): Path<TenantId>,
    Json(body): Json<UpdateTenantRequest>,
) -> Response {
    match services.admin.update_tenant(principal.user_id(), tenant_id, &body.name).await {
        Ok(tenant) => (StatusCode::OK, Json(TenantResponse::from(tenant))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn update_member_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(membership_id): Path<MembershipId>,
    Json(body): Json<UpdateRoleRequest>,
) -> Response {
    match services
        .admin
        .update_user_role(principal.user_id(), membership_id, body.role_id)
        .await
    {
        Ok(membership) => (StatusCode::OK, Json(MembershipResponse::from(membership))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}
