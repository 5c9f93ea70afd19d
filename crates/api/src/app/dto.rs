//! Request and response bodies that are not plain service types.

use serde::{Deserialize, Serialize};

use tenantgate_auth::SessionRecord;
use tenantgate_core::{Membership, MembershipId, RoleId, Tenant, TenantId, User, UserId};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
}

#[derive(Debug, Deserialize)]
pub struct SelectTenantRequest {
    pub email: String,
    pub password: String,
    pub tenant_id: TenantId,
}

#[derive(Debug, Deserialize)]
pub struct SwitchTenantRequest {
    pub tenant_id: TenantId,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub is_active: bool,
}

/// Body of the verification-resend and forgot-password endpoints.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignMemberRequest {
    pub user_id: UserId,
    pub role_id: RoleId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role_id: RoleId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RolesQuery {
    #[serde(default)]
    pub include_permissions: bool,
}

#[derive(Debug, Deserialize)]
pub struct OAuthStateRequest {
    pub app_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: String,
    pub state: String,
}

/// Session snapshot as shown to its holder.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub tenant_slug: String,
    pub role_id: Option<RoleId>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub scope: String,
    pub email: String,
    pub name: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl From<&SessionRecord> for SessionResponse {
    fn from(record: &SessionRecord) -> Self {
        Self {
            user_id: record.user_id,
            tenant_id: record.tenant_id,
            tenant_slug: record.tenant_slug.clone(),
            role_id: record.role_id,
            roles: record.roles.iter().map(|r| r.as_str().to_string()).collect(),
            permissions: record.permissions.iter().map(|p| p.as_str().to_string()).collect(),
            scope: record.scope.clone(),
            email: record.email.clone(),
            name: record.name.clone(),
            issued_at: record.issued_at,
            expires_at: record.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub revoked: usize,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: UserId,
    pub user_uuid: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub is_verified: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            user_uuid: user.identity,
            name: user.name,
            email: user.email.as_str().to_string(),
            is_active: user.is_active,
            is_verified: user.is_verified,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub membership_id: MembershipId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role_id: RoleId,
}

impl From<Membership> for MembershipResponse {
    fn from(m: Membership) -> Self {
        Self {
            membership_id: m.id,
            user_id: m.user_id,
            tenant_id: m.tenant_id,
            role_id: m.role_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub tenant_id: TenantId,
    pub name: String,
    pub slug: String,
}

impl From<Tenant> for TenantResponse {
    fn from(t: Tenant) -> Self {
        Self {
            tenant_id: t.id,
            name: t.name,
            slug: t.slug.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OAuthStateResponse {
    pub state: String,
}
