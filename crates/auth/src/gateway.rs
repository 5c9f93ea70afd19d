//! Dual-mode request authentication protocol.
//!
//! An upstream gateway that already introspected the caller's token injects
//! identity headers plus `X-Authenticated: true`. Without that marker the
//! request must carry its own bearer credential. The choice is a pure
//! function of the headers, made per request.

use tenantgate_core::{RoleId, TenantId, UserId};

use crate::{AuthContext, AuthError, Permission, Role};

/// Header names, lowercase so they are valid `HeaderName` statics.
pub mod headers {
    pub const AUTHENTICATED: &str = "x-authenticated";
    pub const TENANT_ID: &str = "x-tenant-id";
    pub const USER_ID: &str = "x-user-id";
    pub const ROLE_ID: &str = "x-role-id";
    pub const ROLE_NAME: &str = "x-role-name";
    pub const PERMISSIONS: &str = "x-permissions";
    pub const AUTHORIZATION: &str = "authorization";
}

/// The literal value that switches a request into header-trust mode.
pub const TRUST_MARKER: &str = "true";

const BEARER_PREFIX: &str = "Bearer ";

/// Read-only view over request headers.
pub trait HeaderSource {
    fn header(&self, name: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    HeaderTrust,
    Bearer,
}

/// Header-trust wins only on an exact `"true"`; anything else is bearer mode.
pub fn select_mode<H: HeaderSource + ?Sized>(source: &H) -> AuthMode {
    match source.header(headers::AUTHENTICATED) {
        Some(TRUST_MARKER) => AuthMode::HeaderTrust,
        _ => AuthMode::Bearer,
    }
}

/// Build a context from gateway-injected headers.
pub fn parse_trusted_headers<H: HeaderSource + ?Sized>(source: &H) -> Result<AuthContext, AuthError> {
    let tenant_raw = non_empty(source, headers::TENANT_ID).ok_or(AuthError::MissingTenantContext)?;
    let tenant_id: TenantId = tenant_raw
        .parse()
        .map_err(|_| AuthError::BadRequest("X-Tenant-ID must be a valid identifier".into()))?;

    let user_raw = non_empty(source, headers::USER_ID).ok_or(AuthError::MissingUserContext)?;
    let user_id: UserId = user_raw
        .parse()
        .map_err(|_| AuthError::BadRequest("X-User-ID must be a valid identifier".into()))?;

    let role_id = non_empty(source, headers::ROLE_ID)
        .map(|raw| raw.parse::<RoleId>())
        .transpose()
        .map_err(|_| AuthError::BadRequest("X-Role-ID must be a valid identifier".into()))?;

    let role = non_empty(source, headers::ROLE_NAME).map(|name| Role::new(name.to_string()));

    let permissions = non_empty(source, headers::PERMISSIONS)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| Permission::new(p.to_string()))
                .collect()
        })
        .unwrap_or_default();

    Ok(AuthContext {
        user_id,
        tenant_id,
        role_id,
        role,
        permissions,
    })
}

/// Extract the credential from `Authorization: Bearer <token>`.
pub fn extract_bearer<H: HeaderSource + ?Sized>(source: &H) -> Result<&str, AuthError> {
    let header = source
        .header(headers::AUTHORIZATION)
        .ok_or(AuthError::Unauthenticated("missing authorization header"))?;

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::Unauthenticated("authorization header must use the Bearer scheme"))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::Unauthenticated("empty bearer token"));
    }
    Ok(token)
}

/// Introspection accepts the token with or without the `Bearer ` prefix.
pub fn strip_bearer_prefix(raw: &str) -> &str {
    let raw = raw.trim();
    raw.strip_prefix(BEARER_PREFIX).map(str::trim).unwrap_or(raw)
}

fn non_empty<'a, H: HeaderSource + ?Sized>(source: &'a H, name: &str) -> Option<&'a str> {
    source.header(name).map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Headers(HashMap<&'static str, String>);

    impl HeaderSource for Headers {
        fn header(&self, name: &str) -> Option<&str> {
            self.0.get(name).map(String::as_str)
        }
    }

    fn request(pairs: &[(&'static str, String)]) -> Headers {
        Headers(pairs.iter().cloned().collect())
    }

    #[test]
    fn trust_marker_must_be_exact() {
        assert_eq!(select_mode(&request(&[(headers::AUTHENTICATED, "true".into())])), AuthMode::HeaderTrust);
        for v in ["True", "1", "yes", " true", ""] {
            assert_eq!(select_mode(&request(&[(headers::AUTHENTICATED, v.into())])), AuthMode::Bearer, "{v:?}");
        }
        assert_eq!(select_mode(&request(&[])), AuthMode::Bearer);
    }

    #[test]
    fn full_header_set_parses() {
        let (tenant, user, role) = (TenantId::new(), UserId::new(), RoleId::new());
        let h = request(&[
            (headers::AUTHENTICATED, "true".into()),
            (headers::TENANT_ID, tenant.to_string()),
            (headers::USER_ID, user.to_string()),
            (headers::ROLE_ID, role.to_string()),
            (headers::ROLE_NAME, "Viewer".into()),
            (headers::PERMISSIONS, "portal:read, portal:list,,".into()),
        ]);
        let ctx = parse_trusted_headers(&h).unwrap();
        assert_eq!(ctx.tenant_id, tenant);
        assert_eq!(ctx.user_id, user);
        assert_eq!(ctx.role_id, Some(role));
        assert_eq!(ctx.role, Some(Role::new("Viewer")));
        assert_eq!(
            ctx.permissions,
            vec![Permission::new("portal:read"), Permission::new("portal:list")]
        );
    }

    #[test]
    fn missing_context_headers_fail_distinctly() {
        let user = UserId::new().to_string();
        let tenant = TenantId::new().to_string();
        assert_eq!(
            parse_trusted_headers(&request(&[(headers::USER_ID, user)])),
            Err(AuthError::MissingTenantContext)
        );
        assert_eq!(
            parse_trusted_headers(&request(&[(headers::TENANT_ID, tenant)])),
            Err(AuthError::MissingUserContext)
        );
    }

    #[test]
    fn unparseable_ids_are_bad_requests() {
        let h = request(&[
            (headers::TENANT_ID, "42".into()),
            (headers::USER_ID, UserId::new().to_string()),
        ]);
        assert!(matches!(parse_trusted_headers(&h), Err(AuthError::BadRequest(_))));

        let h = request(&[
            (headers::TENANT_ID, TenantId::new().to_string()),
            (headers::USER_ID, UserId::new().to_string()),
            (headers::ROLE_ID, "admin".into()),
        ]);
        assert!(matches!(parse_trusted_headers(&h), Err(AuthError::BadRequest(_))));
    }

    #[test]
    fn bearer_extraction() {
        let h = request(&[(headers::AUTHORIZATION, "Bearer abc ".into())]);
        assert_eq!(extract_bearer(&h), Ok("abc"));
        for v in ["abc", "Basic abc", "Bearer   "] {
            let h = request(&[(headers::AUTHORIZATION, v.into())]);
            assert!(matches!(extract_bearer(&h), Err(AuthError::Unauthenticated(_))), "{v:?}");
        }
        assert!(extract_bearer(&request(&[])).is_err());
    }

    #[test]
    fn introspection_prefix_is_optional() {
        assert_eq!(strip_bearer_prefix("Bearer ref_abc"), "ref_abc");
        assert_eq!(strip_bearer_prefix(" ref_abc "), "ref_abc");
    }
}
