//! Embedded, versioned schema migrations.
//!
//! Migration SQL is compiled into the binary so a deployment is a single
//! artifact. Applied versions are tracked in `schema_migrations`; each pending
//! migration runs inside its own transaction.

use crate::errors::{Result, TaskplaneError};
use crate::storage::DbPool;

const MIGRATIONS: &[(&str, &str)] =
    &[("0001_initial_schema", include_str!("../../migrations/0001_initial_schema.sql"))];

/// Apply all pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .map_err(|err| TaskplaneError::Database {
        source: err,
        context: "Failed to create schema_migrations table".to_string(),
    })?;

    for (version, sql) in MIGRATIONS {
        let applied: Option<String> =
            sqlx::query_scalar("SELECT version FROM schema_migrations WHERE version = $1")
                .bind(version)
                .fetch_optional(pool)
                .await
                .map_err(|err| TaskplaneError::Database {
                    source: err,
                    context: "Failed to query applied migrations".to_string(),
                })?;

        if applied.is_some() {
            continue;
        }

        let mut tx = pool.begin().await.map_err(|err| TaskplaneError::Database {
            source: err,
            context: format!("Failed to begin transaction for migration {}", version),
        })?;

        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|err| TaskplaneError::Database {
            source: err,
            context: format!("Failed to apply migration {}", version),
        })?;

        sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(|err| TaskplaneError::Database {
                source: err,
                context: format!("Failed to record migration {}", version),
            })?;

        tx.commit().await.map_err(|err| TaskplaneError::Database {
            source: err,
            context: format!("Failed to commit migration {}", version),
        })?;

        tracing::info!(version = version, "Applied database migration");
    }

    Ok(())
}
