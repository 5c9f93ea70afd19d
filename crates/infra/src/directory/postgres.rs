//! Postgres-backed directory.
//!
//! ## Expected schema
//!
//! ```sql
//! users        (id UUID PK, identity UUID UNIQUE, name TEXT, email TEXT, password_hash TEXT NULL,
//!               is_active BOOL, is_verified BOOL, provider TEXT NULL, provider_id TEXT NULL,
//!               created_at TIMESTAMPTZ, updated_at TIMESTAMPTZ, deleted_at TIMESTAMPTZ NULL)
//!               -- UNIQUE (email) WHERE deleted_at IS NULL
//! tenants      (id UUID PK, name TEXT UNIQUE, slug TEXT UNIQUE, is_active BOOL, config JSONB,
//!               created_at TIMESTAMPTZ, updated_at TIMESTAMPTZ)
//! tenant_roles (id UUID PK, tenant_id UUID, name TEXT, description TEXT, UNIQUE (tenant_id, name))
//! permissions  (seq BIGSERIAL, id UUID PK, role_id UUID, resource TEXT, action TEXT)
//! memberships  (id UUID PK, user_id UUID, tenant_id UUID, role_id UUID, joined_at TIMESTAMPTZ,
//!               deleted_at TIMESTAMPTZ NULL)
//!               -- UNIQUE (user_id, tenant_id) WHERE deleted_at IS NULL
//! ```
//!
//! ## Error mapping
//!
//! | SQLx error | DirectoryError |
//! |------------|----------------|
//! | Database, code `23505` | `Conflict` |
//! | RowNotFound | `NotFound` |
//! | anything else | `Unavailable` |
//! | deadline elapsed | `Timeout` |

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use tenantgate_core::{
    Email, Membership, MembershipId, Permission, ProviderBinding, Role, RoleId, Tenant, TenantId,
    TenantSlug, User, UserId,
};

use super::{Directory, DirectoryError, DirectoryTx};
use crate::deadline::within;

const USER_COLUMNS: &str = "id, identity, name, email, password_hash, is_active, is_verified, \
                            provider, provider_id, created_at, updated_at, deleted_at";
const TENANT_COLUMNS: &str = "id, name, slug, is_active, config, created_at, updated_at";
const ROLE_COLUMNS: &str = "id, tenant_id, name, description";
const PERMISSION_COLUMNS: &str = "id, role_id, resource, action";
const MEMBERSHIP_COLUMNS: &str = "id, user_id, tenant_id, role_id, joined_at, deleted_at";

#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
    deadline: Duration,
}

impl PgDirectory {
    pub fn new(pool: PgPool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    async fn fetch_optional<T>(
        &self,
        operation: &'static str,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
        map: fn(&PgRow) -> Result<T, DirectoryError>,
    ) -> Result<Option<T>, DirectoryError> {
        within(self.deadline, operation, async {
            let row = query
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error(operation, e))?;
            row.as_ref().map(map).transpose()
        })
        .await
    }

    async fn fetch_all<T>(
        &self,
        operation: &'static str,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
        map: fn(&PgRow) -> Result<T, DirectoryError>,
    ) -> Result<Vec<T>, DirectoryError> {
        within(self.deadline, operation, async {
            let rows = query
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error(operation, e))?;
            rows.iter().map(map).collect()
        })
        .await
    }
}

#[async_trait]
impl Directory for PgDirectory {
    #[instrument(skip(self), err)]
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        self.fetch_optional("find_user", sqlx::query(&sql).bind(id.as_uuid()), user_from_row)
            .await
    }

    #[instrument(skip(self, email), err)]
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, DirectoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        self.fetch_optional("find_user_by_email", sqlx::query(&sql).bind(email.as_str()), user_from_row)
            .await
    }

    async fn find_user_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, DirectoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE provider = $1 AND provider_id = $2 AND deleted_at IS NULL"
        );
        self.fetch_optional(
            "find_user_by_provider",
            sqlx::query(&sql).bind(provider).bind(provider_id),
            user_from_row,
        )
        .await
    }

    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>, DirectoryError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1");
        self.fetch_optional("find_tenant", sqlx::query(&sql).bind(id.as_uuid()), tenant_from_row)
            .await
    }

    async fn tenant_slug_exists(&self, slug: &TenantSlug) -> Result<bool, DirectoryError> {
        let query = sqlx::query("SELECT 1 AS present FROM tenants WHERE slug = $1").bind(slug.as_str());
        let found = self.fetch_optional("tenant_slug_exists", query, |_| Ok(())).await?;
        Ok(found.is_some())
    }

    async fn find_role(&self, id: RoleId) -> Result<Option<Role>, DirectoryError> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM tenant_roles WHERE id = $1");
        self.fetch_optional("find_role", sqlx::query(&sql).bind(id.as_uuid()), role_from_row)
            .await
    }

    async fn roles_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Role>, DirectoryError> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM tenant_roles WHERE tenant_id = $1 ORDER BY name");
        self.fetch_all("roles_for_tenant", sqlx::query(&sql).bind(tenant_id.as_uuid()), role_from_row)
            .await
    }

    #[instrument(skip(self), err)]
    async fn permissions_for_role(&self, role_id: RoleId) -> Result<Vec<Permission>, DirectoryError> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE role_id = $1 ORDER BY seq");
        self.fetch_all(
            "permissions_for_role",
            sqlx::query(&sql).bind(role_id.as_uuid()),
            permission_from_row,
        )
        .await
    }

    async fn find_membership(&self, id: MembershipId) -> Result<Option<Membership>, DirectoryError> {
        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE id = $1 AND deleted_at IS NULL"
        );
        self.fetch_optional("find_membership", sqlx::query(&sql).bind(id.as_uuid()), membership_from_row)
            .await
    }

    #[instrument(skip(self), err)]
    async fn memberships_for_user(&self, user_id: UserId) -> Result<Vec<Membership>, DirectoryError> {
        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships \
             WHERE user_id = $1 AND deleted_at IS NULL ORDER BY joined_at"
        );
        self.fetch_all(
            "memberships_for_user",
            sqlx::query(&sql).bind(user_id.as_uuid()),
            membership_from_row,
        )
        .await
    }

    async fn memberships_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Membership>, DirectoryError> {
        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships \
             WHERE tenant_id = $1 AND deleted_at IS NULL ORDER BY joined_at"
        );
        self.fetch_all(
            "memberships_for_tenant",
            sqlx::query(&sql).bind(tenant_id.as_uuid()),
            membership_from_row,
        )
        .await
    }

    async fn begin(&self) -> Result<Box<dyn DirectoryTx>, DirectoryError> {
        let tx = within(self.deadline, "begin_transaction", async {
            self.pool
                .begin()
                .await
                .map_err(|e| map_sqlx_error("begin_transaction", e))
        })
        .await?;
        Ok(Box::new(PgDirectoryTx {
            tx,
            deadline: self.deadline,
        }))
    }
}

/// Open Postgres transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PgDirectoryTx {
    tx: Transaction<'static, Postgres>,
    deadline: Duration,
}

impl PgDirectoryTx {
    async fn fetch_optional<T>(
        &mut self,
        operation: &'static str,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
        map: fn(&PgRow) -> Result<T, DirectoryError>,
    ) -> Result<Option<T>, DirectoryError> {
        let conn = &mut *self.tx;
        within(self.deadline, operation, async move {
            let row = query
                .fetch_optional(conn)
                .await
                .map_err(|e| map_sqlx_error(operation, e))?;
            row.as_ref().map(map).transpose()
        })
        .await
    }

    async fn fetch_all<T>(
        &mut self,
        operation: &'static str,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
        map: fn(&PgRow) -> Result<T, DirectoryError>,
    ) -> Result<Vec<T>, DirectoryError> {
        let conn = &mut *self.tx;
        within(self.deadline, operation, async move {
            let rows = query
                .fetch_all(conn)
                .await
                .map_err(|e| map_sqlx_error(operation, e))?;
            rows.iter().map(map).collect()
        })
        .await
    }

    /// Execute a write; `missing` names the record when no row was touched.
    async fn execute(
        &mut self,
        operation: &'static str,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
        missing: Option<&'static str>,
    ) -> Result<(), DirectoryError> {
        let conn = &mut *self.tx;
        let result = within(self.deadline, operation, async move {
            query
                .execute(conn)
                .await
                .map_err(|e| map_sqlx_error(operation, e))
        })
        .await?;
        match missing {
            Some(what) if result.rows_affected() == 0 => Err(DirectoryError::NotFound(what)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DirectoryTx for PgDirectoryTx {
    async fn find_user_by_email(&mut self, email: &Email) -> Result<Option<User>, DirectoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        self.fetch_optional("tx_find_user_by_email", sqlx::query(&sql).bind(email.as_str()), user_from_row)
            .await
    }

    async fn find_tenant_by_slug(&mut self, slug: &TenantSlug) -> Result<Option<Tenant>, DirectoryError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE slug = $1");
        self.fetch_optional("tx_find_tenant_by_slug", sqlx::query(&sql).bind(slug.as_str()), tenant_from_row)
            .await
    }

    async fn roles_for_tenant(&mut self, tenant_id: TenantId) -> Result<Vec<Role>, DirectoryError> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM tenant_roles WHERE tenant_id = $1 ORDER BY name");
        self.fetch_all("tx_roles_for_tenant", sqlx::query(&sql).bind(tenant_id.as_uuid()), role_from_row)
            .await
    }

    async fn find_role_by_name(&mut self, tenant_id: TenantId, name: &str) -> Result<Option<Role>, DirectoryError> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM tenant_roles WHERE tenant_id = $1 AND name = $2");
        self.fetch_optional(
            "tx_find_role_by_name",
            sqlx::query(&sql).bind(tenant_id.as_uuid()).bind(name),
            role_from_row,
        )
        .await
    }

    async fn permissions_for_role(&mut self, role_id: RoleId) -> Result<Vec<Permission>, DirectoryError> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE role_id = $1 ORDER BY seq");
        self.fetch_all(
            "tx_permissions_for_role",
            sqlx::query(&sql).bind(role_id.as_uuid()),
            permission_from_row,
        )
        .await
    }

    async fn find_membership_for(
        &mut self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> Result<Option<Membership>, DirectoryError> {
        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships \
             WHERE user_id = $1 AND tenant_id = $2 AND deleted_at IS NULL"
        );
        self.fetch_optional(
            "tx_find_membership_for",
            sqlx::query(&sql).bind(user_id.as_uuid()).bind(tenant_id.as_uuid()),
            membership_from_row,
        )
        .await
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&mut self, user: &User) -> Result<(), DirectoryError> {
        let (provider, provider_id) = provider_columns(user);
        let sql = format!("INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)");
        let query = sqlx::query(&sql)
            .bind(user.id.as_uuid())
            .bind(user.identity)
            .bind(&user.name)
            .bind(user.email.as_str())
            .bind(&user.password_hash)
            .bind(user.is_active)
            .bind(user.is_verified)
            .bind(provider)
            .bind(provider_id)
            .bind(user.created_at)
            .bind(user.updated_at)
            .bind(user.deleted_at);
        self.execute("insert_user", query, None).await
    }

    async fn update_user(&mut self, user: &User) -> Result<(), DirectoryError> {
        let (provider, provider_id) = provider_columns(user);
        let query = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, is_active = $5, is_verified = $6,
                provider = $7, provider_id = $8, updated_at = $9, deleted_at = $10
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_verified)
        .bind(provider)
        .bind(provider_id)
        .bind(user.updated_at)
        .bind(user.deleted_at);
        self.execute("update_user", query, Some("user")).await
    }

    #[instrument(skip(self, tenant), fields(slug = %tenant.slug), err)]
    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<(), DirectoryError> {
        let sql = format!("INSERT INTO tenants ({TENANT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)");
        let query = sqlx::query(&sql)
            .bind(tenant.id.as_uuid())
            .bind(&tenant.name)
            .bind(tenant.slug.as_str())
            .bind(tenant.is_active)
            .bind(&tenant.config)
            .bind(tenant.created_at)
            .bind(tenant.updated_at);
        self.execute("insert_tenant", query, None).await
    }

    async fn update_tenant(&mut self, tenant: &Tenant) -> Result<(), DirectoryError> {
        let query = sqlx::query(
            "UPDATE tenants SET name = $2, is_active = $3, config = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(tenant.is_active)
        .bind(&tenant.config)
        .bind(tenant.updated_at);
        self.execute("update_tenant", query, Some("tenant")).await
    }

    async fn insert_role(&mut self, role: &Role) -> Result<(), DirectoryError> {
        let sql = format!("INSERT INTO tenant_roles ({ROLE_COLUMNS}) VALUES ($1, $2, $3, $4)");
        let query = sqlx::query(&sql)
            .bind(role.id.as_uuid())
            .bind(role.tenant_id.as_uuid())
            .bind(&role.name)
            .bind(&role.description);
        self.execute("insert_role", query, None).await
    }

    async fn insert_permission(&mut self, permission: &Permission) -> Result<(), DirectoryError> {
        let sql = format!("INSERT INTO permissions ({PERMISSION_COLUMNS}) VALUES ($1, $2, $3, $4)");
        let query = sqlx::query(&sql)
            .bind(permission.id.as_uuid())
            .bind(permission.role_id.as_uuid())
            .bind(&permission.resource)
            .bind(&permission.action);
        self.execute("insert_permission", query, None).await
    }

    async fn update_permission(&mut self, permission: &Permission) -> Result<(), DirectoryError> {
        let query = sqlx::query("UPDATE permissions SET resource = $2, action = $3 WHERE id = $1")
            .bind(permission.id.as_uuid())
            .bind(&permission.resource)
            .bind(&permission.action);
        self.execute("update_permission", query, Some("permission")).await
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DirectoryError> {
        let sql = format!("INSERT INTO memberships ({MEMBERSHIP_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)");
        let query = sqlx::query(&sql)
            .bind(membership.id.as_uuid())
            .bind(membership.user_id.as_uuid())
            .bind(membership.tenant_id.as_uuid())
            .bind(membership.role_id.as_uuid())
            .bind(membership.joined_at)
            .bind(membership.deleted_at);
        self.execute("insert_membership", query, None).await
    }

    async fn update_membership_role(&mut self, id: MembershipId, role_id: RoleId) -> Result<(), DirectoryError> {
        let query = sqlx::query(
            "UPDATE memberships SET role_id = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(role_id.as_uuid());
        self.execute("update_membership_role", query, Some("membership")).await
    }

    async fn delete_membership(&mut self, id: MembershipId) -> Result<(), DirectoryError> {
        let query = sqlx::query(
            "UPDATE memberships SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid());
        self.execute("delete_membership", query, Some("membership")).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DirectoryError> {
        let PgDirectoryTx { tx, deadline } = *self;
        within(deadline, "commit_transaction", async {
            tx.commit()
                .await
                .map_err(|e| map_sqlx_error("commit_transaction", e))
        })
        .await
    }
}

fn provider_columns(user: &User) -> (Option<&str>, Option<&str>) {
    match &user.provider {
        Some(b) => (Some(b.provider.as_str()), Some(b.provider_id.as_str())),
        None => (None, None),
    }
}

// SQLx row mapping

fn user_from_row(row: &PgRow) -> Result<User, DirectoryError> {
    let email: String = row.try_get("email").map_err(corrupt)?;
    let provider: Option<String> = row.try_get("provider").map_err(corrupt)?;
    let provider_id: Option<String> = row.try_get("provider_id").map_err(corrupt)?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(corrupt)?),
        identity: row.try_get("identity").map_err(corrupt)?,
        name: row.try_get("name").map_err(corrupt)?,
        email: Email::parse(&email).map_err(|e| DirectoryError::Corrupt(e.to_string()))?,
        password_hash: row.try_get("password_hash").map_err(corrupt)?,
        is_active: row.try_get("is_active").map_err(corrupt)?,
        is_verified: row.try_get("is_verified").map_err(corrupt)?,
        provider: provider
            .zip(provider_id)
            .map(|(provider, provider_id)| ProviderBinding { provider, provider_id }),
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
        deleted_at: row.try_get("deleted_at").map_err(corrupt)?,
    })
}

fn tenant_from_row(row: &PgRow) -> Result<Tenant, DirectoryError> {
    let slug: String = row.try_get("slug").map_err(corrupt)?;
    Ok(Tenant {
        id: TenantId::from_uuid(row.try_get("id").map_err(corrupt)?),
        name: row.try_get("name").map_err(corrupt)?,
        slug: TenantSlug::parse(&slug).map_err(|e| DirectoryError::Corrupt(e.to_string()))?,
        is_active: row.try_get("is_active").map_err(corrupt)?,
        config: row.try_get("config").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
    })
}

fn role_from_row(row: &PgRow) -> Result<Role, DirectoryError> {
    Ok(Role {
        id: RoleId::from_uuid(row.try_get("id").map_err(corrupt)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(corrupt)?),
        name: row.try_get("name").map_err(corrupt)?,
        description: row.try_get("description").map_err(corrupt)?,
    })
}

fn permission_from_row(row: &PgRow) -> Result<Permission, DirectoryError> {
    Ok(Permission {
        id: tenantgate_core::PermissionId::from_uuid(row.try_get("id").map_err(corrupt)?),
        role_id: RoleId::from_uuid(row.try_get("role_id").map_err(corrupt)?),
        resource: row.try_get("resource").map_err(corrupt)?,
        action: row.try_get("action").map_err(corrupt)?,
    })
}

fn membership_from_row(row: &PgRow) -> Result<Membership, DirectoryError> {
    Ok(Membership {
        id: MembershipId::from_uuid(row.try_get("id").map_err(corrupt)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(corrupt)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(corrupt)?),
        role_id: RoleId::from_uuid(row.try_get("role_id").map_err(corrupt)?),
        joined_at: row.try_get("joined_at").map_err(corrupt)?,
        deleted_at: row.try_get("deleted_at").map_err(corrupt)?,
    })
}

fn corrupt(err: sqlx::Error) -> DirectoryError {
    DirectoryError::Corrupt(err.to_string())
}

/// Map SQLx errors to DirectoryError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DirectoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => DirectoryError::Conflict(msg),
                _ => DirectoryError::Unavailable(msg),
            }
        }
        sqlx::Error::RowNotFound => DirectoryError::NotFound("row"),
        other => DirectoryError::Unavailable(format!("sqlx error in {}: {}", operation, other)),
    }
}
