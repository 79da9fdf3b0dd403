//! `PostgreSQL` implementation of [`UserRepository`] backed by the `users` table.

use super::{NewUser, StoreError, User, UserRepository};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{Instrument, Span, info_span};

#[derive(Clone, Debug)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_span(operation: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.sql.table = "users",
        db.operation = operation
    )
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find(&self, id: i64) -> Result<Option<User>, StoreError> {
        let query = r"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
        ";

        let user = sqlx::query_as::<_, User>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT"))
            .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = r"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
        ";

        let user = sqlx::query_as::<_, User>(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT"))
            .await?;

        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let query = r"
            INSERT INTO users (username, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, password_hash, created_at, updated_at
        ";

        let created = sqlx::query_as::<_, User>(query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT"))
            .await?;

        Ok(created)
    }

    async fn update(&self, user: &User) -> Result<bool, StoreError> {
        let query = r"
            UPDATE users
            SET username = $1, email = $2, updated_at = $3
            WHERE id = $4
        ";

        let result = sqlx::query(query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.updated_at)
            .bind(user.id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE"))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("DELETE"))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let query = r"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM users
            ORDER BY id ASC
            LIMIT $1 OFFSET $2
        ";

        let users = sqlx::query_as::<_, User>(query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT"))
            .await?;

        Ok(users)
    }
}
