use async_trait::async_trait;
use sqlx::PgPool;

use super::{NewUser, UserRecord, UserStore};
use crate::error::StoreError;

type UserRow = (i64, String, String, Option<String>);

fn into_record((id, email, password_hash, refresh_token_hash): UserRow) -> UserRecord {
    UserRecord {
        id,
        email,
        password_hash,
        refresh_token_hash,
    }
}

/// PostgreSQL-backed user store (`users` table, see `migrations/`).
///
/// Refresh-token hash changes are single `UPDATE` statements, so each is
/// atomic per row; the swap carries the expected hash in its `WHERE` clause.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unexpected(format!("Migration failed: {}", e)))
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, refresh_token_hash FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_record))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, refresh_token_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_record))
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserRecord {
            id,
            email: user.email,
            password_hash: user.password_hash,
            refresh_token_hash: None,
        })
    }

    async fn set_refresh_token_hash(&self, id: i64, hash: String) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $1, updated_at = now()
            WHERE id = $2
            "#,
        )
        .bind(hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn swap_refresh_token_hash(
        &self,
        id: i64,
        expected: &str,
        hash: String,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $1, updated_at = now()
            WHERE id = $2 AND refresh_token_hash = $3
            "#,
        )
        .bind(hash)
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_token_hash(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = NULL, updated_at = now()
            WHERE id = $1 AND refresh_token_hash IS NOT NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
