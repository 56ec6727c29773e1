//! User repository for account storage and credential lookups.

use crate::auth::models::{NewUser, Role, User};
use crate::domain::{OrganizationId, UserId};
use crate::errors::{Result, TaskplaneError};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub organization_id: Option<String>,
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

const SELECT_COLUMNS: &str =
    "id, name, email, role, organization_id, password_hash, created_at, updated_at";

fn to_model(row: UserRow) -> Result<(User, String)> {
    let role = Role::from_str(&row.role).map_err(|_| {
        TaskplaneError::validation(format!("Unknown role '{}' for user {}", row.role, row.id))
    })?;

    let user = User {
        id: UserId::from_string(row.id),
        name: row.name,
        email: row.email,
        role,
        organization_id: row.organization_id.map(OrganizationId::from_string),
        created_at: row.created_at,
        updated_at: row.updated_at,
    };
    Ok((user, row.password_hash))
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn get_user(&self, id: &UserId) -> Result<User>;

    /// Fetch a user and their stored password hash for credential checks.
    /// Returns `None` for an unknown email; the caller decides how much to
    /// reveal.
    async fn find_by_email_with_hash(&self, email: &str) -> Result<Option<(User, String)>>;

    async fn email_exists(&self, email: &str) -> Result<bool>;

    async fn organization_exists(&self, id: &OrganizationId) -> Result<bool>;

    async fn update_password_hash(&self, id: &UserId, password_hash: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, organization_id, password_hash, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.organization_id.as_ref())
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                TaskplaneError::conflict("email address is already registered", "user")
            }
            _ => TaskplaneError::Database {
                source: err,
                context: "Failed to insert user".to_string(),
            },
        })?;

        self.get_user(&user.id).await
    }

    async fn get_user(&self, id: &UserId) -> Result<User> {
        let row: UserRow =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", SELECT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| TaskplaneError::Database {
                    source: err,
                    context: "Failed to fetch user".to_string(),
                })?
                .ok_or_else(|| TaskplaneError::not_found("user", id.as_str()))?;

        to_model(row).map(|(user, _)| user)
    }

    async fn find_by_email_with_hash(&self, email: &str) -> Result<Option<(User, String)>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", SELECT_COLUMNS))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| TaskplaneError::Database {
                    source: err,
                    context: "Failed to fetch user by email".to_string(),
                })?;

        row.map(to_model).transpose()
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| TaskplaneError::Database {
                source: err,
                context: "Failed to check email existence".to_string(),
            })?;

        Ok(count > 0)
    }

    async fn organization_exists(&self, id: &OrganizationId) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| TaskplaneError::Database {
                source: err,
                context: "Failed to check organization existence".to_string(),
            })?;

        Ok(count > 0)
    }

    async fn update_password_hash(&self, id: &UserId, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to update password hash".to_string(),
        })?;

        if result.rows_affected() == 0 {
            return Err(TaskplaneError::not_found("user", id.as_str()));
        }

        Ok(())
    }
}
