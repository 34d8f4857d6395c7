use sqlx::PgPool;
use time::OffsetDateTime;

use crate::models::{SessionRecord, TwoFactorRecord, UserRecord};

use super::{CredentialStore, StoreError};

/// Postgres-backed credential store.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CredentialStore for PgCredentialStore {
    async fn get_user(&self, user_key: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT user_key, display_name, email, password_hash,
                   two_factor_enabled, status, created_at, updated_at, last_login
            FROM users
            WHERE user_key = $1
            "#,
        )
        .bind(user_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn user_exists(&self, user_key: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE user_key = $1)
            "#,
        )
        .bind(user_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users
                (user_key, display_name, email, password_hash,
                 two_factor_enabled, status, created_at, updated_at, last_login)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&user.user_key)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.two_factor_enabled)
        .bind(user.status)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate,
            other => StoreError::Database(other),
        })?;

        Ok(())
    }

    async fn record_login(&self, user_key: &str, at: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login = $2, updated_at = $2
            WHERE user_key = $1
            "#,
        )
        .bind(user_key)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_two_factor(&self, user_key: &str) -> Result<Option<TwoFactorRecord>, StoreError> {
        let record = sqlx::query_as::<_, TwoFactorRecord>(
            r#"
            SELECT user_key, seed, enabled, created_at, last_used
            FROM two_factor
            WHERE user_key = $1
            "#,
        )
        .bind(user_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Record insert and flag flip run in one transaction so a crash cannot
    /// leave the flag set without a seed (or the reverse).
    async fn enable_two_factor(&self, record: &TwoFactorRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO two_factor (user_key, seed, enabled, created_at, last_used)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.user_key)
        .bind(&record.seed)
        .bind(record.enabled)
        .bind(record.created_at)
        .bind(record.last_used)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET two_factor_enabled = true, updated_at = $2
            WHERE user_key = $1
            "#,
        )
        .bind(&record.user_key)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn disable_two_factor(&self, user_key: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM two_factor
            WHERE user_key = $1
            "#,
        )
        .bind(user_key)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET two_factor_enabled = false, updated_at = NOW()
            WHERE user_key = $1
            "#,
        )
        .bind(user_key)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn touch_two_factor(&self, user_key: &str, at: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE two_factor
            SET last_used = $2
            WHERE user_key = $1
            "#,
        )
        .bind(user_key)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions
                (session_key, user_key, access_token, refresh_token, created_at, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&session.session_key)
        .bind(&session.user_key)
        .bind(&session.access_token)
        .bind(&session.refresh_token)
        .bind(session.created_at)
        .bind(session.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
