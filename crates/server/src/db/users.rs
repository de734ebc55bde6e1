//! User repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use neyisek_core::{Email, UserId, UserRole};

use super::{RepositoryError, UserStore};
use crate::models::User;

/// Repository for the `users` table.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    uid: UserId,
    email: String,
    display_name: Option<String>,
    phone_number: Option<String>,
    address: Option<String>,
    role: String,
    is_admin: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = row
            .role
            .parse::<UserRole>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            uid: row.uid,
            email,
            display_name: row.display_name,
            phone_number: row.phone_number,
            address: row.address,
            role,
            is_admin: row.is_admin,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn upsert(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO users (uid, email, display_name, phone_number, address, role, is_admin,
                               is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (uid) DO UPDATE
                SET email = EXCLUDED.email,
                    display_name = EXCLUDED.display_name,
                    phone_number = EXCLUDED.phone_number,
                    address = EXCLUDED.address,
                    role = EXCLUDED.role,
                    is_admin = EXCLUDED.is_admin,
                    is_active = EXCLUDED.is_active,
                    updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(&user.uid)
        .bind(user.email.as_str())
        .bind(user.display_name.as_deref())
        .bind(user.phone_number.as_deref())
        .bind(user.address.as_deref())
        .bind(user.role.to_string())
        .bind(user.is_admin)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, uid: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT uid, email, display_name, phone_number, address, role, is_admin, is_active,
                   created_at, updated_at
            FROM users
            WHERE uid = $1
            ",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}
