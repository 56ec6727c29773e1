//! Refresh-token repository.
//!
//! Rows in `refresh_tokens` are append-only: rotation and revocation write
//! terminal markers (`revoked_at`, `replaced_by_hash`) but never delete, so a
//! replayed token can always be recognized for what it is.

use crate::auth::models::{NewRefreshToken, RefreshTokenRecord};
use crate::domain::{RefreshTokenId, UserId};
use crate::errors::{Result, TaskplaneError};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
struct RefreshTokenRow {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub revoked_at: Option<chrono::DateTime<chrono::Utc>>,
    pub replaced_by_hash: Option<String>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshTokenRecord {
            id: RefreshTokenId::from_string(row.id),
            user_id: UserId::from_string(row.user_id),
            token_hash: row.token_hash,
            created_at: row.created_at,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            replaced_by_hash: row.replaced_by_hash,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, user_id, token_hash, created_at, expires_at, revoked_at, replaced_by_hash";

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Store a brand-new token record.
    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord>;

    /// Look up a record by its digest, in any lifecycle state.
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>>;

    /// Atomically retire the record matching `old_hash` and insert its
    /// successor.
    ///
    /// The retirement is a conditional UPDATE that only matches a still-active
    /// row; under concurrent rotation of the same token exactly one caller's
    /// UPDATE takes effect. Returns `None` when this caller lost (the row was
    /// already terminal or absent), in which case nothing is written.
    async fn rotate(
        &self,
        old_hash: &str,
        successor: NewRefreshToken,
    ) -> Result<Option<RefreshTokenRecord>>;

    /// Mark the record matching the digest revoked. Idempotent; a missing or
    /// already-terminal record is not an error.
    async fn revoke_by_hash(&self, token_hash: &str) -> Result<()>;

    /// Revoke every still-active token belonging to the user. Returns the
    /// number of tokens revoked.
    async fn revoke_all_for_user(&self, user_id: &UserId) -> Result<u64>;

    /// Count tokens for the user that are still active.
    async fn count_active_for_user(&self, user_id: &UserId) -> Result<i64>;
}

#[derive(Debug, Clone)]
pub struct SqlxRefreshTokenRepository {
    pool: DbPool,
}

impl SqlxRefreshTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for SqlxRefreshTokenRepository {
    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(&token.token_hash)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to insert refresh token".to_string(),
        })?;

        Ok(RefreshTokenRecord {
            id: token.id,
            user_id: token.user_id,
            token_hash: token.token_hash,
            created_at: token.created_at,
            expires_at: token.expires_at,
            revoked_at: None,
            replaced_by_hash: None,
        })
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {} FROM refresh_tokens WHERE token_hash = $1",
            SELECT_COLUMNS
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to fetch refresh token".to_string(),
        })?;

        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn rotate(
        &self,
        old_hash: &str,
        successor: NewRefreshToken,
    ) -> Result<Option<RefreshTokenRecord>> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to begin transaction for token rotation".to_string(),
        })?;

        let retired = sqlx::query(
            "UPDATE refresh_tokens
             SET revoked_at = $1, replaced_by_hash = $2
             WHERE token_hash = $3
               AND revoked_at IS NULL
               AND replaced_by_hash IS NULL
               AND expires_at > $4",
        )
        .bind(now)
        .bind(&successor.token_hash)
        .bind(old_hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to retire refresh token".to_string(),
        })?;

        if retired.rows_affected() != 1 {
            // Lost the race or the token was already terminal; leave no trace.
            tx.rollback().await.map_err(|err| TaskplaneError::Database {
                source: err,
                context: "Failed to roll back token rotation".to_string(),
            })?;
            return Ok(None);
        }

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&successor.id)
        .bind(&successor.user_id)
        .bind(&successor.token_hash)
        .bind(successor.created_at)
        .bind(successor.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to insert successor refresh token".to_string(),
        })?;

        tx.commit().await.map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to commit token rotation".to_string(),
        })?;

        Ok(Some(RefreshTokenRecord {
            id: successor.id,
            user_id: successor.user_id,
            token_hash: successor.token_hash,
            created_at: successor.created_at,
            expires_at: successor.expires_at,
            revoked_at: None,
            replaced_by_hash: None,
        }))
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> Result<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $1
             WHERE token_hash = $2 AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to revoke refresh token".to_string(),
        })?;

        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: &UserId) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $1
             WHERE user_id = $2 AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to revoke user refresh tokens".to_string(),
        })?;

        Ok(result.rows_affected())
    }

    async fn count_active_for_user(&self, user_id: &UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM refresh_tokens
             WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2",
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to count active refresh tokens".to_string(),
        })?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::RefreshTokenState;
    use crate::storage::tests_support::migrated_pool;
    use chrono::Duration;

    async fn seed_user(pool: &DbPool) -> UserId {
        let id = UserId::new();
        sqlx::query(
            "INSERT INTO users (id, name, email, role, password_hash) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&id)
        .bind("Repo Test")
        .bind(format!("{}@example.com", id))
        .bind("member")
        .bind("hash")
        .execute(pool)
        .await
        .unwrap();
        id
    }

    fn new_token(user_id: &UserId, hash: &str) -> NewRefreshToken {
        let now = Utc::now();
        NewRefreshToken {
            id: RefreshTokenId::new(),
            user_id: user_id.clone(),
            token_hash: hash.to_string(),
            created_at: now,
            expires_at: now + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn insert_and_find_by_hash() {
        let pool = migrated_pool().await;
        let repo = SqlxRefreshTokenRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        repo.insert(new_token(&user_id, "hash-1")).await.unwrap();

        let found = repo.find_by_hash("hash-1").await.unwrap().unwrap();
        assert_eq!(found.user_id, user_id);
        assert_eq!(found.state_at(Utc::now()), RefreshTokenState::Active);

        assert!(repo.find_by_hash("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rotate_retires_old_and_creates_successor() {
        let pool = migrated_pool().await;
        let repo = SqlxRefreshTokenRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        repo.insert(new_token(&user_id, "old-hash")).await.unwrap();

        let successor = repo.rotate("old-hash", new_token(&user_id, "new-hash")).await.unwrap();
        assert!(successor.is_some());

        let old = repo.find_by_hash("old-hash").await.unwrap().unwrap();
        assert_eq!(old.state_at(Utc::now()), RefreshTokenState::Replaced);
        assert_eq!(old.replaced_by_hash.as_deref(), Some("new-hash"));

        let new = repo.find_by_hash("new-hash").await.unwrap().unwrap();
        assert_eq!(new.state_at(Utc::now()), RefreshTokenState::Active);
    }

    #[tokio::test]
    async fn rotate_admits_exactly_one_winner() {
        let pool = migrated_pool().await;
        let repo = SqlxRefreshTokenRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        repo.insert(new_token(&user_id, "contested")).await.unwrap();

        let first = repo.rotate("contested", new_token(&user_id, "winner")).await.unwrap();
        assert!(first.is_some());

        // The second rotation of the same token must fail and write nothing.
        let second = repo.rotate("contested", new_token(&user_id, "loser")).await.unwrap();
        assert!(second.is_none());
        assert!(repo.find_by_hash("loser").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rotate_refuses_expired_token() {
        let pool = migrated_pool().await;
        let repo = SqlxRefreshTokenRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        let mut token = new_token(&user_id, "stale");
        token.expires_at = Utc::now() - Duration::minutes(1);
        repo.insert(token).await.unwrap();

        let result = repo.rotate("stale", new_token(&user_id, "fresh")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn revoke_by_hash_is_idempotent() {
        let pool = migrated_pool().await;
        let repo = SqlxRefreshTokenRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        repo.insert(new_token(&user_id, "revocable")).await.unwrap();

        repo.revoke_by_hash("revocable").await.unwrap();
        let first = repo.find_by_hash("revocable").await.unwrap().unwrap().revoked_at;

        repo.revoke_by_hash("revocable").await.unwrap();
        let second = repo.find_by_hash("revocable").await.unwrap().unwrap().revoked_at;

        // Second revocation must not move the timestamp
        assert_eq!(first, second);

        // Unknown hash is a no-op, not an error
        repo.revoke_by_hash("missing").await.unwrap();
    }

    #[tokio::test]
    async fn revoke_all_for_user_hits_only_that_user() {
        let pool = migrated_pool().await;
        let repo = SqlxRefreshTokenRepository::new(pool.clone());
        let alice = seed_user(&pool).await;
        let bob = seed_user(&pool).await;

        repo.insert(new_token(&alice, "alice-1")).await.unwrap();
        repo.insert(new_token(&alice, "alice-2")).await.unwrap();
        repo.insert(new_token(&bob, "bob-1")).await.unwrap();

        let revoked = repo.revoke_all_for_user(&alice).await.unwrap();
        assert_eq!(revoked, 2);

        assert_eq!(repo.count_active_for_user(&alice).await.unwrap(), 0);
        assert_eq!(repo.count_active_for_user(&bob).await.unwrap(), 1);
    }
}
