use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::{auth::password::hash_password, error::ApiError};

/// User row. Deliberately does not implement `Serialize`: the hash must never
/// have a path to a response body, so projection always goes through
/// `UserResponse`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: i64) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, full_name, is_active, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, full_name, is_active, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn list(db: &PgPool, skip: i64, limit: i64) -> Result<Vec<User>, ApiError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, full_name, is_active, created_at
            FROM users
            ORDER BY id
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Insert a new user, hashing the password first. The unique constraint
    /// on `email` is the authoritative duplicate check; any handler-level
    /// pre-check only exists for a friendlier fast path.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<User, ApiError> {
        let hashed = hash_password(password)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, hashed_password, full_name)
            VALUES ($1, $2, $3)
            RETURNING id, email, hashed_password, full_name, is_active, created_at
            "#,
        )
        .bind(email)
        .bind(&hashed)
        .bind(full_name)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::DuplicateEmail
            } else {
                ApiError::from(e)
            }
        })?;
        Ok(user)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}
