//! PostgreSQL user repository

use std::time::Duration;

use async_trait::async_trait;
use duet_common::{bounded, RepositoryError};
use sqlx::PgPool;
use uuid::Uuid;

use super::UserStore;
use crate::domain::entities::User;

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        bounded(self.timeout, async {
            let created = sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (id, email, name, password_hash, created_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, email, name, password_hash, created_at
                "#,
            )
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match RepositoryError::from(e) {
                err if err.is_unique_violation() => RepositoryError::AlreadyExists,
                err => err,
            })?;

            Ok(created)
        })
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        bounded(self.timeout, async {
            let user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, name, password_hash, created_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(user)
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        bounded(self.timeout, async {
            let user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, name, password_hash, created_at
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

            Ok(user)
        })
        .await
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepositoryError> {
        bounded(self.timeout, async {
            let users = sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, name, password_hash, created_at
                FROM users
                WHERE id = ANY($1)
                "#,
            )
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

            Ok(users)
        })
        .await
    }

    async fn list_except(&self, id: Uuid) -> Result<Vec<User>, RepositoryError> {
        bounded(self.timeout, async {
            let users = sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, name, password_hash, created_at
                FROM users
                WHERE id <> $1
                ORDER BY name ASC, created_at ASC
                "#,
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

            Ok(users)
        })
        .await
    }
}
