//! Process configuration from environment variables.

use std::time::Duration;

use thiserror::Error;

use tenantgate_infra::SessionConfig;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

/// How bearer credentials on protected routes are verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerMode {
    /// Phantom tokens backed by the session store.
    Session,
    /// Locally verified HS256 credentials.
    Signed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server_addr: String,
    pub session: SessionConfig,
    pub store_timeout: Duration,
    pub bearer_mode: BearerMode,
    pub jwt_secret: String,
    pub password_pepper: Option<String>,
    pub use_persistent_stores: bool,
    pub redis_url: String,
    pub database_url: Option<String>,
    pub gateway_admin_url: Option<String>,
    pub gateway_admin_timeout: Duration,
    pub seed_system_roles: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset or empty variables take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bearer_mode = match get("BEARER_MODE").as_deref() {
            None | Some("session") => BearerMode::Session,
            Some("signed") => BearerMode::Signed,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "BEARER_MODE",
                    value: other.to_string(),
                    reason: "expected 'session' or 'signed'",
                });
            }
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            if bearer_mode == BearerMode::Signed {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
            }
            DEV_JWT_SECRET.to_string()
        });

        let use_persistent_stores = parse_bool(&get, "USE_PERSISTENT_STORES", false)?;
        let database_url = get("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            server_addr: get("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            session: SessionConfig {
                ttl: Duration::from_secs(parse_u64(&get, "SESSION_TTL_SECS", 1800)?),
                oauth_state_ttl: Duration::from_secs(parse_u64(&get, "OAUTH_STATE_TTL_SECS", 600)?),
                verification_ttl: Duration::from_secs(parse_u64(&get, "VERIFICATION_TTL_SECS", 86_400)?),
                password_reset_ttl: Duration::from_secs(parse_u64(&get, "PASSWORD_RESET_TTL_SECS", 3600)?),
            },
            store_timeout: Duration::from_millis(parse_u64(&get, "STORE_TIMEOUT_MS", 2000)?),
            bearer_mode,
            jwt_secret,
            password_pepper: get("PASSWORD_PEPPER"),
            use_persistent_stores,
            redis_url: get("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
            database_url,
            gateway_admin_url: get("GATEWAY_ADMIN_URL"),
            gateway_admin_timeout: Duration::from_secs(parse_u64(&get, "GATEWAY_ADMIN_TIMEOUT_SECS", 30)?),
            seed_system_roles: parse_bool(&get, "SEED_SYSTEM_ROLES", true)?,
        })
    }
}

fn parse_u64(get: &impl Fn(&str) -> Option<String>, var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(raw) => match raw.parse::<u64>() {
            Ok(0) | Err(_) => Err(ConfigError::Invalid {
                var,
                value: raw,
                reason: "expected a positive integer",
            }),
            Ok(v) => Ok(v),
        },
    }
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.to_ascii_lowercase().parse::<bool>().map_err(|_| ConfigError::Invalid {
            var,
            value: raw,
            reason: "expected 'true' or 'false'",
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.server_addr, "0.0.0.0:8080");
        assert_eq!(cfg.session.ttl, Duration::from_secs(1800));
        assert_eq!(cfg.session.oauth_state_ttl, Duration::from_secs(600));
        assert_eq!(cfg.session.verification_ttl, Duration::from_secs(86_400));
        assert_eq!(cfg.session.password_reset_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.store_timeout, Duration::from_millis(2000));
        assert_eq!(cfg.bearer_mode, BearerMode::Session);
        assert!(cfg.seed_system_roles);
        assert!(!cfg.use_persistent_stores);
        assert!(cfg.gateway_admin_url.is_none());
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(config(&[("BEARER_MODE", "jwt")]), Err(ConfigError::Invalid { var: "BEARER_MODE", .. })));
        assert!(matches!(config(&[("SESSION_TTL_SECS", "0")]), Err(ConfigError::Invalid { .. })));
        assert!(matches!(config(&[("SEED_SYSTEM_ROLES", "maybe")]), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn persistent_stores_need_a_database() {
        assert_eq!(config(&[("USE_PERSISTENT_STORES", "true")]), Err(ConfigError::Missing("DATABASE_URL")));
        let cfg = config(&[("USE_PERSISTENT_STORES", "TRUE"), ("DATABASE_URL", "postgres://localhost/gate")]).unwrap();
        assert!(cfg.use_persistent_stores);
    }
}
