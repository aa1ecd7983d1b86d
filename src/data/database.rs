//! SQLite database operations
//!
//! All database access goes through this module.

use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if needed) the SQLite file at `path` and run migrations.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Get a user by local ID
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get a user by provider identity
    pub async fn find_user_by_provider(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE provider = ? AND provider_user_id = ?",
        )
        .bind(provider)
        .bind(provider_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Insert a user unless the provider identity already exists.
    ///
    /// The unique index on (provider, provider_user_id) makes this atomic,
    /// so concurrent first logins cannot produce duplicate rows.
    ///
    /// # Returns
    /// `true` if inserted, `false` if the identity already had a row.
    pub async fn insert_user_if_absent(&self, id: &str, user: &NewUser) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                id, provider, provider_user_id, access_token, avatar_url, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (provider, provider_user_id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(user.provider)
        .bind(&user.provider_user_id)
        .bind(&user.access_token)
        .bind(&user.avatar_url)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Count users, optionally restricted to one provider
    pub async fn count_users(&self, provider: Option<Provider>) -> Result<i64, AppError> {
        let count: i64 = match provider {
            Some(provider) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE provider = ?")
                    .bind(provider)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count)
    }
}
