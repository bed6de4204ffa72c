use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use billforge_auth::User;
use billforge_core::{ExpectedVersion, UserId};

use super::{UserDirectory, email_taken};
use crate::db::map_sqlx_error;
use crate::error::StoreError;

/// `users` table: JSONB body plus the columns needed for lookups.
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: Arc<PgPool>,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn decode(row: &PgRow) -> Result<User, StoreError> {
    let body: serde_json::Value = row
        .try_get("body")
        .map_err(|e| map_sqlx_error("decode", e))?;
    let version: i64 = row
        .try_get("version")
        .map_err(|e| map_sqlx_error("decode", e))?;
    let mut user: User = serde_json::from_value(body)?;
    user.version = version as u64;
    Ok(user)
}

fn email_conflict(operation: &str, err: sqlx::Error) -> StoreError {
    match map_sqlx_error(operation, err) {
        StoreError::Conflict(_) => email_taken(),
        other => other,
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn create(&self, mut user: User) -> Result<User, StoreError> {
        user.version = 1;
        let body = serde_json::to_value(&user)?;
        sqlx::query(
            r#"
            INSERT INTO users (id, email, version, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(1_i64)
        .bind(body)
        .bind(user.timestamps.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| email_conflict("create_user", e))?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT version, body FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, email), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT version, body FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id, version = user.version), err)]
    async fn update(&self, mut user: User) -> Result<User, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT version FROM users WHERE id = $1 FOR UPDATE")
                .bind(user.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_user", e))?;
        let current = current.ok_or(StoreError::NotFound)? as u64;
        if current != user.version {
            return Err(StoreError::version_mismatch(
                ExpectedVersion::Exact(user.version),
                current,
            ));
        }

        user.version = current + 1;
        let body = serde_json::to_value(&user)?;
        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, version = $3, body = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(user.version as i64)
        .bind(body)
        .bind(user.timestamps.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| email_conflict("update_user", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(user)
    }
}
