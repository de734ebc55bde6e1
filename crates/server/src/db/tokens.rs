//! Push messaging token repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use neyisek_core::{TokenId, UserId};

use super::{RepositoryError, TokenStore};
use crate::models::DeviceToken;

/// Repository for the `fcm_tokens` table.
#[derive(Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    /// Create a new token repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: TokenId,
    user_id: UserId,
    token: String,
    active: bool,
    platform: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TokenRow> for DeviceToken {
    fn from(row: TokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            active: row.active,
            platform: row.platform,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl TokenStore for PgTokenRepository {
    async fn upsert(
        &self,
        user_id: &UserId,
        token: &str,
        platform: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DeviceToken, RepositoryError> {
        // A token moves to whichever user registered it last.
        let row = sqlx::query_as::<_, TokenRow>(
            r"
            INSERT INTO fcm_tokens (id, user_id, token, active, platform, created_at, updated_at)
            VALUES ($1, $2, $3, TRUE, $4, $5, $5)
            ON CONFLICT (token) DO UPDATE
                SET user_id = EXCLUDED.user_id,
                    active = TRUE,
                    platform = COALESCE(EXCLUDED.platform, fcm_tokens.platform),
                    updated_at = EXCLUDED.updated_at
            RETURNING id, user_id, token, active, platform, created_at, updated_at
            ",
        )
        .bind(TokenId::generate())
        .bind(user_id)
        .bind(token)
        .bind(platform)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn active_for_users(
        &self,
        user_ids: &[UserId],
    ) -> Result<Vec<DeviceToken>, RepositoryError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = user_ids.iter().map(UserId::as_str).collect();
        let rows = sqlx::query_as::<_, TokenRow>(
            r"
            SELECT id, user_id, token, active, platform, created_at, updated_at
            FROM fcm_tokens
            WHERE active AND user_id = ANY($1)
            ORDER BY created_at
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn all_active(&self) -> Result<Vec<DeviceToken>, RepositoryError> {
        let rows = sqlx::query_as::<_, TokenRow>(
            r"
            SELECT id, user_id, token, active, platform, created_at, updated_at
            FROM fcm_tokens
            WHERE active
            ORDER BY created_at
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn deactivate(
        &self,
        tokens: &[String],
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        if tokens.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE fcm_tokens SET active = FALSE, updated_at = $2 WHERE token = ANY($1) AND active",
        )
        .bind(tokens)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
