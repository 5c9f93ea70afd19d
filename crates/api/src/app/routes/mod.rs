use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub mod accounts;
pub mod auth;
pub mod introspect;
pub mod oauth;
pub mod registration;
pub mod system;
pub mod tenants;

/// Endpoints that establish identity and so cannot require it.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/select-tenant", post(auth::select_tenant))
        .route("/auth/register", post(registration::register))
        .route("/auth/introspect", post(introspect::introspect))
        .route("/auth/oauth/state", post(oauth::issue_state))
        .route("/auth/oauth/:provider/callback", get(oauth::callback))
        .route("/auth/verify-email", post(accounts::verify_email))
        .route("/auth/verify-email/resend", post(accounts::resend_verification))
        .route("/auth/password/forgot", post(accounts::forgot_password))
        .route("/auth/password/reset", post(accounts::reset_password))
}

/// Endpoints operating on the caller's own phantom-token session.
pub fn session_router() -> Router {
    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/switch-tenant", post(auth::switch_tenant))
        .route("/auth/session", get(auth::session))
        .route("/auth/sessions", delete(auth::revoke_all))
}

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/profile", get(tenants::profile).put(accounts::update_profile))
        .route("/profile/password", put(accounts::change_password))
        .route("/users", post(tenants::create_user))
        .route("/users/:id", delete(accounts::delete_user))
        .route("/users/:id/status", put(accounts::change_status))
        .route("/tenants/:id", put(tenants::update_tenant))
        .route("/tenants/:id/members", get(tenants::members).post(tenants::assign_member))
        .route("/tenants/:id/members/:user_id", delete(tenants::remove_member))
        .route("/tenants/:id/roles", get(tenants::roles))
        .route("/memberships/:id/role", put(tenants::update_member_role))
}
